
mod automation_tests;
mod panic_prevention_tests;
