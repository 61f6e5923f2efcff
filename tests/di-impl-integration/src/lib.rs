//! 依赖注入的集中端到端测试工程
