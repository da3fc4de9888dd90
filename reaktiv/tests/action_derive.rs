use reaktiv::{Action, Priority};

#[derive(Action, Clone, Debug)]
#[action(module = "Counter")]
enum CounterAction {
    Increment,
    #[action(priority = "high")]
    Reset,
}

#[derive(Action, Clone, Debug)]
enum MixedAction {
    #[action(module = "Search")]
    Start,
    #[action(module = "Search", priority = "high")]
    Cancel,
}

#[test]
fn container_level_module_tag_applies_to_every_variant() {
    assert_eq!(CounterAction::Increment.module_tag(), "Counter");
    assert_eq!(CounterAction::Reset.module_tag(), "Counter");
}

#[test]
fn variant_level_priority_overrides_the_default() {
    assert!(!CounterAction::Increment.is_high_priority());
    assert!(CounterAction::Reset.is_high_priority());
    assert_eq!(CounterAction::Increment.priority(), Priority::Normal);
    assert_eq!(CounterAction::Reset.priority(), Priority::High);
}

#[test]
fn variant_level_module_tag_works_without_a_container_default() {
    assert_eq!(MixedAction::Start.module_tag(), "Search");
    assert_eq!(MixedAction::Cancel.module_tag(), "Search");
    assert!(MixedAction::Cancel.is_high_priority());
}

#[test]
fn name_reports_the_variant_identifier() {
    assert_eq!(CounterAction::Increment.name(), "Increment");
    assert_eq!(CounterAction::Reset.name(), "Reset");
}
