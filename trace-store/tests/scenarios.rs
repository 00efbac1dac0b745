//  Copyright 2024 The trace-store Authors
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

//! The six concrete ingest/read scenarios a `Project` must satisfy.
use trace_store::{GetSpansQuery, Project};
use trace_types::{AttributeValue, Evaluation, EvaluationResult, EvaluationSubject, Span, SpanId, SpanKind, StatusCode, Timestamp, TraceId};

const T_NANOS: u64 = 1_704_067_200_000_000_000; // 2024-01-01T00:00:00Z

fn ts(offset_ms: u64) -> Timestamp {
    Timestamp::from_unix_nanos(T_NANOS + offset_ms * 1_000_000)
}

fn span(id: &str, trace: &str, parent: Option<&str>, start_ms: u64, end_ms: u64, token_total: Option<i64>, status: StatusCode) -> Span {
    let mut builder = Span::builder();
    builder
        .span_id(id)
        .trace_id(trace)
        .name("op")
        .span_kind(SpanKind::Chain)
        .status_code(status)
        .start_time(ts(start_ms))
        .end_time(ts(end_ms));
    if let Some(parent) = parent {
        builder.parent_span_id(parent);
    }
    if let Some(total) = token_total {
        builder
            .attribute("llm.token_count.total", AttributeValue::Int(total))
            .unwrap();
    }
    builder.build()
}

#[test]
fn scenario_1_single_root() {
    let project = Project::new();
    project.spans().add_span(span("A", "T1", None, 0, 50, Some(10), StatusCode::Ok));

    assert_eq!(project.spans().span_count(), 1);
    assert_eq!(project.spans().trace_count(), 1);
    assert_eq!(project.spans().token_count_total(), 10);

    let trace = project.spans().get_trace(&TraceId::from("T1"));
    assert_eq!(trace.len(), 1);
    assert_eq!(trace[0].computed().latency_ms, Some(50.0));
    assert_eq!(trace[0].computed().cumulative_llm_token_count_total, 10.0);
    assert_eq!(trace[0].computed().error_count, Some(0.0));

    let q = project.spans().root_span_latency_ms_quantile(0.5).unwrap();
    assert!((q - 50.0).abs() < 1.0);
}

#[test]
fn scenario_2_parent_before_child() {
    let project = Project::new();
    project.spans().add_span(span("A", "T1", None, 0, 50, Some(10), StatusCode::Ok));
    project.spans().add_span(span("B", "T1", Some("A"), 5, 20, Some(4), StatusCode::Error));

    assert_eq!(project.spans().span_count(), 2);

    let a = &project.spans().get_spans(GetSpansQuery::new().span_ids(vec![SpanId::from("A")]))[0];
    assert_eq!(a.computed().cumulative_llm_token_count_total, 14.0);
    assert_eq!(a.computed().cumulative_error_count, 1.0);

    let b = &project.spans().get_spans(GetSpansQuery::new().span_ids(vec![SpanId::from("B")]))[0];
    assert_eq!(b.computed().cumulative_error_count, 1.0);

    assert_eq!(project.spans().token_count_total(), 14);
}

#[test]
fn scenario_3_child_before_parent_matches_scenario_2() {
    let project = Project::new();
    project.spans().add_span(span("B", "T1", Some("A"), 5, 20, Some(4), StatusCode::Error));

    let b = &project.spans().get_spans(GetSpansQuery::new().span_ids(vec![SpanId::from("B")]))[0];
    assert_eq!(b.computed().cumulative_error_count, 1.0);
    assert_eq!(project.spans().span_count(), 1);

    project.spans().add_span(span("A", "T1", None, 0, 50, Some(10), StatusCode::Ok));

    let a = &project.spans().get_spans(GetSpansQuery::new().span_ids(vec![SpanId::from("A")]))[0];
    assert_eq!(a.computed().cumulative_llm_token_count_total, 14.0);
    assert_eq!(a.computed().cumulative_error_count, 1.0);
    assert_eq!(project.spans().token_count_total(), 14);
}

#[test]
fn scenario_4_duplicate_ignored() {
    let project = Project::new();
    project.spans().add_span(span("A", "T1", None, 0, 50, Some(10), StatusCode::Ok));
    project.spans().add_span(span("A", "T1", None, 0, 50, Some(10), StatusCode::Ok));

    assert_eq!(project.spans().span_count(), 1);
    assert_eq!(project.spans().token_count_total(), 10);
}

#[test]
fn scenario_5_evaluations() {
    let project = Project::new();
    project.spans().add_span(span("A", "T1", None, 0, 50, Some(10), StatusCode::Ok));

    let span_result = EvaluationResult::builder().label("yes").score(0.9).build().unwrap();
    project.evaluations().add_evaluation(Evaluation::new(
        "relevance",
        EvaluationSubject::Span(SpanId::from("A")),
        span_result,
    ));

    let result = project
        .evaluations()
        .get_span_evaluation(&SpanId::from("A"), "relevance")
        .unwrap();
    assert_eq!(result.result().score(), Some(0.9));
    assert!(project
        .evaluations()
        .get_span_evaluation_labels("relevance")
        .contains("yes"));

    let doc_result = EvaluationResult::builder().score(0.4).build().unwrap();
    project.evaluations().add_evaluation(Evaluation::new(
        "doc_rel",
        EvaluationSubject::Document {
            span_id: SpanId::from("A"),
            document_position: 2,
        },
        doc_result,
    ));

    let scores = project
        .evaluations()
        .get_document_evaluation_scores(&SpanId::from("A"), "doc_rel", 4);
    assert!(scores[0].is_nan());
    assert!(scores[1].is_nan());
    assert_eq!(scores[2], 0.4);
    assert!(scores[3].is_nan());
}

#[test]
fn scenario_6_time_range_sweep() {
    let project = Project::new();
    project.spans().add_span(span("A", "T1", None, 0, 10, None, StatusCode::Ok));
    project.spans().add_span(span(
        "B",
        "T1",
        None,
        60 * 60 * 1000,
        60 * 60 * 1000 + 10,
        None,
        StatusCode::Ok,
    ));
    project.spans().add_span(span(
        "C",
        "T1",
        None,
        2 * 60 * 60 * 1000,
        2 * 60 * 60 * 1000 + 10,
        None,
        StatusCode::Ok,
    ));

    let mut query = GetSpansQuery::new();
    query.start(ts(0)).stop(ts(2 * 60 * 60 * 1000)).root_only(true);
    let spans = project.spans().get_spans(&query);

    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].span_id(), &SpanId::from("B"));
    assert_eq!(spans[1].span_id(), &SpanId::from("A"));
}
