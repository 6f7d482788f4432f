use malt_trace::engine::MaltTrace;
use malt_trace::output::csv::{write_global_peak, write_leaks, write_timeline};
use malt_trace::output::{
    dump_all, dump_leaks, dump_timeline, read_summary, validate_path, write_summary, CsvPaths,
};
use malt_trace::utils::config::EngineConfig;
use malt_trace::utils::error::OutputError;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;
use tempfile::NamedTempFile;

fn create_test_trace() -> MaltTrace {
    let value = json!({
        "globals": {"ticksPerSecond": 1000},
        "sites": {
            "strings": ["alloc_node", "main", "/src/tree.c"],
            "instr": {
                "f1": {"file": 2, "function": 0, "line": 14},
                "f2": {"file": 2, "function": 1, "line": 3}
            }
        },
        "stacks": {"stats": [
            {"stack": ["f1", "f2"], "stackId": "s1",
             "infos": {"alloc": {"count": 8, "sum": 2097152}, "globalPeak": 1048576}},
            {"stack": ["f2"], "stackId": "s2",
             "infos": {"alloc": {"count": 1, "sum": 16}, "globalPeak": 0}}
        ]},
        "timeline": {"memoryTimeline": {
            "perPoints": 500,
            "fields": ["requestedMem", "physicalMem"],
            "values": [[100, 4096], [250, 8192]],
            "callsite": ["s1", "s2"]
        }},
        "leaks": [{"memory": 524288, "count": 2, "stack": ["f1", "0xbad"]}]
    });
    MaltTrace::from_value(value, &EngineConfig::new()).unwrap()
}

fn render<F>(write: F) -> String
where
    F: FnOnce(&mut Vec<u8>),
{
    let mut buffer = Vec::new();
    write(&mut buffer);
    String::from_utf8(buffer).unwrap()
}

#[test]
fn test_timeline_csv() {
    let trace = create_test_trace();
    let csv = render(|buf| write_timeline(&trace, buf).unwrap());

    assert_eq!(
        csv,
        "\"time(s)\",\"request\",\"requestedMem\",\"physicalMem\",\"location\"\n\
         0.5,100,100,4096,\"< 14:alloc_node < 3:main\"\n\
         1,150,250,8192,\"< 3:main\"\n"
    );
}

#[test]
fn test_global_peak_csv() {
    let trace = create_test_trace();
    let csv = render(|buf| write_global_peak(&trace, buf).unwrap());

    assert_eq!(
        csv,
        "\"Memory(MB)\",\"location\"\n1.000,\"< 14:alloc_node < 3:main\"\n"
    );
}

#[test]
fn test_leaks_csv() {
    let trace = create_test_trace();
    let csv = render(|buf| write_leaks(&trace, buf).unwrap());

    assert_eq!(
        csv,
        "\"Memory(MB)\",\"count\",\"location\"\n0.500,2,\"< 14:alloc_node < ??:0xbad\"\n"
    );
}

#[test]
fn test_dump_all_next_to_trace() {
    let trace = create_test_trace();
    let temp_dir = tempfile::tempdir().unwrap();
    let paths = CsvPaths::for_trace(&temp_dir.path().join("out").join("malt-tree-42.json"));

    dump_all(&trace, &paths).unwrap();

    assert!(paths.timeline.ends_with("malt-tree-42_timeline.csv"));
    assert!(paths.timeline.exists());
    assert!(paths.global_peak.exists());
    assert!(paths.leaks.exists());

    let leaks = std::fs::read_to_string(&paths.leaks).unwrap();
    assert_eq!(leaks.lines().count(), 2);
}

#[test]
fn test_summary_roundtrip() {
    let trace = create_test_trace();
    let summary = trace.summary(5);
    assert_eq!(summary.total_allocated, 2097152 + 16);
    assert_eq!(summary.leaked, 524288);
    assert_eq!(summary.top_allocations[0].function, "alloc_node");

    let temp_file = NamedTempFile::new().unwrap();
    write_summary(&summary, temp_file.path()).unwrap();
    let loaded = read_summary(temp_file.path()).unwrap();

    assert_eq!(loaded.version, summary.version);
    assert_eq!(loaded.top_allocations, summary.top_allocations);
    assert_eq!(loaded.top_peaks, summary.top_peaks);
    assert_eq!(loaded.timeline_samples, 2);
}

#[test]
fn test_validate_path() {
    let temp_dir = tempfile::tempdir().unwrap();

    assert!(validate_path(Path::new("")).is_err());
    assert!(validate_path(temp_dir.path()).is_err());
    assert!(validate_path(&temp_dir.path().join("dump.csv")).is_ok());
}

#[test]
fn test_dump_without_path_goes_to_stdout() {
    let trace = create_test_trace();
    assert!(dump_timeline(&trace, None).is_ok());
    assert!(dump_leaks(&trace, None).is_ok());
}

#[test]
fn test_dump_into_directory_fails() {
    let trace = create_test_trace();
    let temp_dir = tempfile::tempdir().unwrap();

    let result = dump_leaks(&trace, Some(temp_dir.path()));
    assert!(matches!(result, Err(OutputError::InvalidPath(_))));
}

#[test]
fn test_dump_under_a_file_fails() {
    let trace = create_test_trace();
    let blocker = NamedTempFile::new().unwrap();
    let path = blocker.path().join("nested").join("timeline.csv");

    let result = dump_timeline(&trace, Some(path.as_path()));
    assert!(matches!(result, Err(OutputError::WriteFailed(_))));
}

#[test]
fn test_global_peak_rows_use_each_record_stack() {
    let value = json!({
        "globals": {"ticksPerSecond": 1000},
        "sites": {
            "strings": ["alloc_node", "main", "/src/tree.c"],
            "instr": {
                "f1": {"file": 2, "function": 0, "line": 14},
                "f2": {"file": 2, "function": 1, "line": 3}
            }
        },
        "stacks": {"stats": [
            {"stack": ["f1"], "stackId": "dup",
             "infos": {"alloc": {"count": 1, "sum": 8}, "globalPeak": 1048576}},
            {"stack": ["f2"], "stackId": "dup",
             "infos": {"alloc": {"count": 1, "sum": 8}, "globalPeak": 2097152}}
        ]},
        "timeline": {"memoryTimeline": {
            "perPoints": 1, "fields": [], "values": [], "callsite": []
        }},
        "leaks": []
    });
    let trace = MaltTrace::from_value(value, &EngineConfig::new()).unwrap();
    let csv = render(|buf| write_global_peak(&trace, buf).unwrap());

    assert_eq!(
        csv,
        "\"Memory(MB)\",\"location\"\n1.000,\"< 14:alloc_node\"\n2.000,\"< 3:main\"\n"
    );
}
