use component_macros::Managed;
use di_abstractions::{Injected, ManagedComponent};

#[derive(Managed)]
struct Holder<T: Send + Sync + 'static> {
    #[inject(qualifier = "primary")]
    value: Injected<T>,
}

fn main() {
    let declaration = <Holder<String> as ManagedComponent>::declaration();
    assert_eq!(declaration.injection_points().len(), 1);
}
