use component_macros::Managed;
use di_abstractions::{DependencyResult, ManagedComponent};

#[derive(Managed)]
#[managed(singleton, name = "clock", qualifier = "utc", on_ready = "start", on_destroy = "stop")]
struct Clock {
    ticks: u64,
}

impl Clock {
    fn start(&self) -> DependencyResult<()> {
        Ok(())
    }

    fn stop(&self) {}
}

fn main() {
    let declaration = Clock::declaration();
    assert_eq!(declaration.name(), "clock");
    assert!(declaration.has_destroy_callback());
}
