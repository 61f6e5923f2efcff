//! 派生宏的集中测试工程
