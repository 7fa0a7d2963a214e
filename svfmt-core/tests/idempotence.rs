//! Property test: formatting is idempotent over generated inputs.
//!
//! Idempotence is not proven, so fuzz it: generate small statement soups with
//! erratic spacing, format once, and require a second format to be a fixed
//! point. Inputs the engine refuses (none should arise from this grammar) are
//! skipped rather than failed.

use proptest::prelude::*;
use svfmt_core::{format_source, FormatStyle};

fn identifier() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}".prop_filter("identifiers must not be keywords", |s| {
        !svfmt_syntax::is_keyword(s)
    })
}

fn spacing() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("".to_string()),
        Just(" ".to_string()),
        Just("   ".to_string()),
    ]
}

fn statement() -> impl Strategy<Value = String> {
    (
        identifier(),
        identifier(),
        identifier(),
        prop_oneof![Just("+"), Just("&"), Just("|"), Just("^")],
        spacing(),
        spacing(),
    )
        .prop_map(|(lhs, a, b, op, s1, s2)| {
            format!("assign {lhs}{s1}={s2}{a} {op} {b};\n")
        })
}

fn module_item() -> impl Strategy<Value = String> {
    prop_oneof![
        statement(),
        (identifier(), identifier()).prop_map(|(a, b)| format!("wire {a}, {b};\n")),
        (identifier(), 0u8..200).prop_map(|(a, n)| format!("localparam {a} = {n};\n")),
    ]
}

fn source() -> impl Strategy<Value = String> {
    (
        identifier(),
        prop::collection::vec(module_item(), 0..4),
        prop::bool::ANY,
    )
        .prop_map(|(name, items, wrap_in_module)| {
            let body: String = items.concat();
            if wrap_in_module {
                format!("module {name}(input a, input b);\n{body}endmodule\n")
            } else {
                body
            }
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn format_is_a_fixed_point(input in source()) {
        let style = FormatStyle::default();
        let Ok(once) = format_source(&input, &style) else {
            return Ok(());
        };
        let twice = format_source(&once, &style)
            .expect("formatted output must format again");
        prop_assert_eq!(&once, &twice, "input was {:?}", input);
    }
}
