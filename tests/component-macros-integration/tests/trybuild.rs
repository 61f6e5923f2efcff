//! trybuild 编译期测试

#[test]
fn trybuild_managed_derive() {
    let t = trybuild::TestCases::new();
    t.pass("tests/trybuild/managed_ok.rs");
    t.pass("tests/trybuild/managed_generic_ok.rs");
    t.pass("tests/trybuild/managed_callbacks_ok.rs");
}
