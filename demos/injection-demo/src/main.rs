//! # 注入演示程序
//!
//! 组合 Orange（单例）→ Blue（依赖）→ Green（依赖）示例对象图，
//! 打印解析计划并查找根组件。

use anyhow::Context;
use clap::Parser;
use component_macros::Managed;
use di_abstractions::{Injected, ResolutionPlan};
use infrastructure_composition::{ApplicationComposer, BeansModule, EjbModule, LoggingConfig};
use std::path::PathBuf;
use tracing::info;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "injection-demo")]
#[command(about = "Lorn DI 注入演示")]
struct Args {
    /// 配置文件路径（TOML 或 JSON）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,

    /// 输出 JSON 格式日志
    #[arg(long)]
    json_logs: bool,
}

/// 会话单例，通过 setter 持有 Blue
#[derive(Managed)]
#[managed(singleton, on_destroy = "release")]
pub struct Orange {
    #[inject]
    blue: Injected<Blue>,
}

impl Orange {
    fn release(&self) {
        info!("Orange 已销毁");
    }
}

#[derive(Managed)]
pub struct Blue {
    #[inject]
    green: Injected<Green>,
}

#[derive(Managed)]
pub struct Green;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let logging = LoggingConfig::default()
        .with_level(args.log_level)
        .with_json(args.json_logs);

    let mut composer = ApplicationComposer::new()
        .with_logging(logging)
        .add_module(EjbModule::new("orange-ejb").singleton::<Orange>())
        .add_module(
            BeansModule::new("colors")
                .add_managed_class::<Blue>()
                .add_managed_class::<Green>(),
        );

    if let Some(path) = &args.config {
        composer = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => composer.add_config_json(path)?,
            _ => composer.add_config_toml(path)?,
        };
    }
    composer = composer.add_config_env_vars("LORN_DI")?;

    let application = composer.compose().await.context("组合应用失败")?;

    print_plan(application.plan());

    let orange = application.lookup::<Orange>()?;
    let blue = orange.blue.get().context("Orange 未注入 Blue")?;
    let has_green = blue.green.is_injected();
    println!("Orange -> Blue: 已注入, Blue -> Green: {}", if has_green { "已注入" } else { "缺失" });

    let metrics = application.metrics().await;
    println!("{}", serde_json::to_string_pretty(&metrics)?);

    application.stop().await?;
    Ok(())
}

fn print_plan(plan: &ResolutionPlan) {
    println!("构造顺序:");
    for (position, group) in plan.groups().iter().enumerate() {
        let members: Vec<&str> = group.members.iter().map(|id| id.short_name()).collect();
        let marker = if group.cyclic { " (环)" } else { "" };
        println!("  {}. {}{}", position + 1, members.join(", "), marker);
    }

    println!("注入边:");
    for edge in plan.edges() {
        println!(
            "  {}.{} -> {} [{}]",
            edge.from.short_name(),
            edge.member,
            edge.to.short_name(),
            edge.kind
        );
    }
}
