//! Property tests for counter modifier parsing and application.

use graphstore_types::CounterModifier;
use proptest::prelude::*;

proptest! {
    #[test]
    fn display_then_parse_is_identity(n in 0i64..1_000_000, op in 0u8..3) {
        let modifier = match op {
            0 => CounterModifier::Increment(n),
            1 => CounterModifier::Decrement(n),
            _ => CounterModifier::Set(n),
        };
        let parsed: CounterModifier = modifier.to_string().parse().unwrap();
        prop_assert_eq!(parsed, modifier);
    }

    #[test]
    fn increment_then_decrement_restores(start in -1_000_000i64..1_000_000, n in 0i64..1_000_000) {
        let value = CounterModifier::Decrement(n).apply(CounterModifier::Increment(n).apply(start));
        prop_assert_eq!(value, start);
    }

    #[test]
    fn set_ignores_current(start in any::<i64>(), n in any::<i64>()) {
        prop_assert_eq!(CounterModifier::Set(n).apply(start), n);
    }
}
