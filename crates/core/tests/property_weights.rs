use proptest::prelude::*;
use rakeweight_core::{GroupedWeighter, Options, Response, Weighter};

proptest! {
    #[test]
    fn weights_respect_caps_and_groups(rows in row_vec(), caps in caps()) {
        let (lower, upper) = caps;
        let responses = to_responses(&rows);
        let options = Options::new(["A", "B"], "G", "goal", "work").with_weight_caps(lower, upper);
        let result = GroupedWeighter::new(options).unwrap().weight(&responses).unwrap();

        let work_ids: Vec<&str> = responses
            .iter()
            .filter(|r| r.value("G") == Some("work"))
            .map(|r| r.respondent_id.as_str())
            .collect();
        prop_assert_eq!(result.weights.len(), work_ids.len());
        for id in &work_ids {
            prop_assert!(result.weights.contains_key(*id));
        }
        for (id, weight) in &result.weights {
            prop_assert!(id.starts_with('w'));
            prop_assert!(*weight >= lower && *weight <= upper, "weight {} outside caps", weight);
        }
        prop_assert!(!result.stats.rmse.is_nan());
        prop_assert!(!result.stats.average_weight.is_nan());
        prop_assert_eq!(result.stats.work_rows, work_ids.len());
        prop_assert_eq!(result.stats.goal_rows, responses.len() - work_ids.len());
        prop_assert!(result.stats.iterations >= 1);
        prop_assert!(result.stats.curbed_percentage >= 0.0 && result.stats.curbed_percentage <= 100.0);
    }

    #[test]
    fn identical_input_gives_identical_weights(rows in row_vec()) {
        let responses = to_responses(&rows);
        let weighter = GroupedWeighter::new(Options::new(["A", "B"], "G", "goal", "work")).unwrap();
        let first = weighter.weight(&responses).unwrap();
        let second = weighter.weight(&responses).unwrap();
        prop_assert_eq!(first.weights.len(), second.weights.len());
        for (id, weight) in &first.weights {
            prop_assert_eq!(weight.to_bits(), second.weights[id.as_str()].to_bits());
        }
    }
}

#[derive(Clone, Debug)]
struct RowSpec {
    work: bool,
    a: u8,
    b: u8,
}

fn to_responses(rows: &[RowSpec]) -> Vec<Response> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            let (prefix, group) = if row.work { ("w", "work") } else { ("g", "goal") };
            Response::new(format!("{prefix}{idx}"))
                .with_value("A", format!("a{}", row.a))
                .with_value("B", format!("b{}", row.b))
                .with_value("G", group)
        })
        .collect()
}

fn row_vec() -> impl Strategy<Value = Vec<RowSpec>> {
    prop::collection::vec(row_spec(), 1..40)
}

fn row_spec() -> impl Strategy<Value = RowSpec> {
    (any::<bool>(), 0u8..3, 0u8..4).prop_map(|(work, a, b)| RowSpec { work, a, b })
}

fn caps() -> impl Strategy<Value = (f64, f64)> {
    (prop_oneof![Just(0.0f64), 0.05f64..1.0], 1.0f64..10.0)
}
