use component_macros::Managed;
use di_abstractions::{Injected, ManagedComponent, Scope};

#[derive(Managed)]
#[managed(singleton)]
struct Orange {
    #[inject]
    blue: Injected<Blue>,
}

#[derive(Managed)]
struct Blue {
    label: String,
}

fn main() {
    let orange = Orange::declaration();
    assert_eq!(orange.scope(), Scope::Singleton);
    assert_eq!(orange.injection_points().len(), 1);

    let blue = Blue::declaration();
    assert_eq!(blue.scope(), Scope::Dependent);
}
