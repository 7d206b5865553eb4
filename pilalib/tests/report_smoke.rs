use pilalib::{
    config::RateTable,
    payload::RunPayload,
    report::write_report,
    service::PilaService,
    store::{InMemoryRunStore, RunStore},
};

#[test]
fn report_has_row_per_line() {
    let run = RunPayload::from_json(include_str!("data/run.json"))
        .expect("payload")
        .into_run(1)
        .expect("run");
    let store = InMemoryRunStore::new();
    store.insert(run).expect("insert");
    let service = PilaService::new(store, RateTable::default());
    service.calculate(1).expect("calculate");

    let run = service.store().get_run_with_lines(1).expect("get");
    let mut out = Vec::new();
    write_report(&mut out, &run).expect("report");
    let text = String::from_utf8(out).expect("utf8");

    let mut rows = text.lines();
    let header = rows.next().expect("header");
    assert!(header.starts_with("line_id,doc_type,doc_number"));
    assert!(header.ends_with("warnings,errors"));

    let first: Vec<&str> = rows.next().expect("row").split(',').collect();
    assert_eq!(first[0], "1");
    assert_eq!(first[2], "1017000001");
    assert_eq!(first[5], "OK");
    assert_eq!(first[7], "1333333");
    assert_eq!(rows.count(), 2);
}
