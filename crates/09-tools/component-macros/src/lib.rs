//! # Component Macros
//!
//! 从结构体定义生成托管组件声明的过程宏。
//!
//! ## 核心宏
//!
//! - [`Managed`](derive@Managed) - 为结构体实现 `di_abstractions::ManagedComponent`
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use component_macros::Managed;
//! use di_abstractions::Injected;
//!
//! #[derive(Managed)]
//! #[managed(singleton, on_destroy = "close")]
//! pub struct Orange {
//!     #[inject]
//!     blue: Injected<Blue>,
//!     label: String,
//! }
//!
//! impl Orange {
//!     fn close(&self) {}
//! }
//! ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod managed;
mod utils;

/// 托管组件派生宏
///
/// 结构体属性 `#[managed(...)]`：
///
/// - `singleton` / `dependent` - 作用域（默认依赖作用域）
/// - `name = "..."` - 显示名称
/// - `qualifier = "..."` - 限定符，可重复
/// - `on_ready = "method"` - 就绪回调，签名 `fn(&self) -> DependencyResult<()>`
/// - `on_destroy = "method"` - 销毁回调，签名 `fn(&self)`
///
/// 字段属性 `#[inject]` / `#[inject(qualifier = "...")]` 只能用于
/// `Injected<T>` 字段，生成字段注入点。其余字段以 `Default::default()` 初始化。
#[proc_macro_derive(Managed, attributes(managed, inject))]
pub fn derive_managed(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    managed::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
