//! Integration tests for clause editing and query dispatch through CellController

use dashcell::cell::{
    CellController, CellProps, Collaborators, DashboardFilterApi, FormData, GeometrySettings,
    InMemoryFilterApi, MeasuredElements, QueryConfig, QueryRunner, Slice, ValueControl,
};
use dashcell::core::{
    ClauseEdit, Datasource, DatasourceType, FilterClause, FilterValue, Operator, SliceId,
    ValueChoice,
};
use dashcell::services::{FetchCompletion, StaticValueLookup};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Default)]
struct RecordingRunner {
    calls: Mutex<Vec<(QueryConfig, bool, u64, String)>>,
}

impl RecordingRunner {
    fn filters(&self, call: usize) -> serde_json::Value {
        self.calls.lock().unwrap()[call].0["filters"].clone()
    }

    fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl QueryRunner for RecordingRunner {
    fn run_query(&self, query: QueryConfig, force_refresh: bool, timeout_secs: u64, cell_key: &str) {
        self.calls
            .lock()
            .unwrap()
            .push((query, force_refresh, timeout_secs, cell_key.to_string()));
    }
}

struct Fixture {
    cell: CellController,
    runner: Arc<RecordingRunner>,
    filter_api: Arc<InMemoryFilterApi>,
    completions: UnboundedReceiver<FetchCompletion>,
}

fn fixture(datasource_type: DatasourceType, filter_select: bool, initial: Vec<FilterClause>) -> Fixture {
    let mut form_data = FormData::default();
    form_data.insert("viz_type".into(), json!("line"));
    form_data.insert("metrics".into(), json!(["sum__num"]));

    let props = CellProps {
        slice: Slice {
            slice_id: SliceId::new(21),
            slice_name: "Trend".into(),
            form_data,
            description_markeddown: Some("Monthly trend".into()),
        },
        chart_key: "slice_21".into(),
        datasource: Some(Datasource {
            id: 8,
            datasource_type,
            filter_select,
            filterable_cols: vec![
                ("region".into(), "Region".into()),
                ("gender".into(), "Gender".into()),
                ("state".into(), "State".into()),
            ],
            metrics_combo: vec![("sum__num".into(), "SUM(num)".into())],
        }),
        timeout_secs: 45,
        widget_width: 640,
        widget_height: 480,
        is_expanded: false,
        edit_mode: true,
        initial_filters: initial,
    };
    let runner = Arc::new(RecordingRunner::default());
    let filter_api = Arc::new(InMemoryFilterApi::new());
    let collaborators = Collaborators {
        query_runner: runner.clone(),
        filter_api: filter_api.clone(),
        value_lookup: Arc::new(
            StaticValueLookup::default()
                .with_column("region", ["east", "west"])
                .with_column("gender", ["boy", "girl"])
                .with_column("state", ["CA", "NY"]),
        ),
    };
    let (cell, completions) = CellController::new(props, collaborators, GeometrySettings::default());
    Fixture {
        cell,
        runner,
        filter_api,
        completions,
    }
}

#[test]
fn test_every_mutation_reruns_query_with_full_filter_list() {
    let Fixture {
        mut cell, runner, ..
    } = fixture(DatasourceType::Table, false, vec![]);

    cell.add_filter().unwrap();
    cell.change_filter(0, ClauseEdit::Value(FilterValue::List(vec!["east".into()])))
        .unwrap();
    cell.add_filter().unwrap();
    cell.change_filter(1, ClauseEdit::Column(Some("gender".into())))
        .unwrap();
    cell.remove_filter(0).unwrap();

    assert_eq!(runner.count(), 5);
    assert_eq!(
        runner.filters(1),
        json!([{"col": "region", "op": "in", "val": ["east"]}])
    );
    assert_eq!(
        runner.filters(3),
        json!([
            {"col": "region", "op": "in", "val": ["east"]},
            {"col": "gender", "op": "in", "val": []},
        ])
    );
    assert_eq!(runner.filters(4), json!([{"col": "gender", "op": "in", "val": []}]));

    let calls = runner.calls.lock().unwrap();
    for (query, force, timeout, key) in calls.iter() {
        assert!(*force);
        assert_eq!(*timeout, 45);
        assert_eq!(key, "slice_21");
        assert_eq!(query["viz_type"], json!("line"));
    }
}

#[test]
fn test_operator_switch_coerces_value_shape() {
    let Fixture { mut cell, .. } = fixture(DatasourceType::Table, false, vec![]);
    cell.add_filter().unwrap();
    cell.change_filter(0, ClauseEdit::Value(FilterValue::List(vec!["a".into(), "b".into()])))
        .unwrap();

    cell.switch_operator(0, Operator::Eq).unwrap();
    assert_eq!(cell.clauses()[0].val, FilterValue::Scalar("a".into()));

    cell.switch_operator(0, Operator::NotIn).unwrap();
    assert_eq!(cell.clauses()[0].val, FilterValue::List(vec!["a".into()]));

    cell.switch_operator(0, Operator::IsNull).unwrap();
    assert_eq!(cell.clauses()[0].val, FilterValue::None);
    assert_eq!(cell.value_control(0), Some(ValueControl::Hidden));

    cell.switch_operator(0, Operator::Lte).unwrap();
    assert_eq!(cell.clauses()[0].val, FilterValue::Scalar(String::new()));
    cell.switch_operator(0, Operator::In).unwrap();
    assert_eq!(cell.clauses()[0].val, FilterValue::List(vec![]));
}

#[test]
fn test_saved_filters_are_normalised_on_load() {
    let saved = vec![FilterClause {
        col: Some("region".into()),
        op: Operator::In,
        val: FilterValue::Scalar("east".into()),
    }];
    let Fixture { cell, .. } = fixture(DatasourceType::Table, false, saved);
    assert_eq!(cell.clauses()[0].val, FilterValue::List(vec!["east".into()]));
    assert_eq!(cell.clauses().len(), cell.cache().len());
}

#[test]
fn test_operator_rules_follow_datasource_and_having_mode() {
    let Fixture { mut cell, .. } = fixture(DatasourceType::Druid, false, vec![]);
    let druid_ops = cell.operator_choices();
    assert!(druid_ops.contains(&Operator::Regex));
    assert!(!druid_ops.contains(&Operator::Like));

    cell.set_having(true);
    let having_ops = cell.operator_choices();
    assert!(!having_ops.is_empty());
    assert!(having_ops.iter().all(|op| op.descriptor().having_only));
    assert_eq!(cell.column_choices()[0].0, "sum__num");

    let Fixture { cell, .. } = fixture(DatasourceType::Table, false, vec![]);
    let table_ops = cell.operator_choices();
    assert!(table_ops.contains(&Operator::Like));
    assert!(!table_ops.contains(&Operator::Regex));
}

#[test]
fn test_invalid_index_is_reported_and_changes_nothing() {
    let Fixture {
        mut cell, runner, ..
    } = fixture(DatasourceType::Table, false, vec![]);
    cell.add_filter().unwrap();

    let err = cell
        .change_filter(3, ClauseEdit::Operator(Operator::Eq))
        .unwrap_err();
    assert_eq!(err.to_string(), "clause index 3 out of range for 1 clause(s)");
    assert!(cell.remove_filter(1).is_err());
    assert_eq!(cell.clauses().len(), 1);
    assert_eq!(runner.count(), 1);
}

#[test]
fn test_chart_props_carry_geometry_and_scoped_filter_api() {
    let Fixture {
        mut cell,
        filter_api,
        ..
    } = fixture(DatasourceType::Table, false, vec![]);
    let metrics = MeasuredElements {
        header: None,
        description: Some(20),
    };

    let props = cell.chart_props(&metrics).unwrap();
    assert_eq!((props.width, props.height, props.header_height), (630, 450, 30));
    assert_eq!(props.timeout_secs, 45);

    assert_eq!(props.query_config["filters"], json!([]));

    cell.add_filter().unwrap();
    cell.change_filter(0, ClauseEdit::Value(FilterValue::List(vec!["east".into()])))
        .unwrap();
    cell.set_expanded(true);
    let props = cell.chart_props(&metrics).unwrap();
    assert_eq!(props.height, 420);
    assert_eq!(
        props.query_config["filters"],
        json!([{"col": "region", "op": "in", "val": ["east"]}])
    );
    assert_eq!(props.query_config, cell.query_config().unwrap());

    props
        .filter_api
        .add_filter("region", &["east".to_string()], false, true);
    let filters = filter_api.get_filters(SliceId::new(21));
    assert_eq!(filters["region"], vec!["east".to_string()]);
}

#[tokio::test]
async fn test_remove_shifts_cache_entries_down() {
    let Fixture {
        mut cell,
        completions: mut rx,
        ..
    } = fixture(
        DatasourceType::Table,
        true,
        vec![
            FilterClause::new(Some("region".into()), Operator::In),
            FilterClause::new(Some("gender".into()), Operator::In),
            FilterClause::new(Some("state".into()), Operator::In),
        ],
    );

    for index in 0..3 {
        cell.refresh_choices(index).unwrap();
        let completion = rx.recv().await.unwrap();
        assert!(cell.on_values_loaded(completion));
    }

    cell.remove_filter(1).unwrap();

    let choices: Vec<Vec<ValueChoice>> = cell.cache().iter().map(|e| e.choices.clone()).collect();
    assert_eq!(
        choices,
        vec![
            vec![ValueChoice::from("east"), ValueChoice::from("west")],
            vec![ValueChoice::from("CA"), ValueChoice::from("NY")],
        ]
    );
    assert_eq!(cell.clauses()[1].col.as_deref(), Some("state"));
}
