//! End-to-end pipeline scenarios with a scripted inference backend.
//!
//! Every character is one token, so lengths in these tests can be read
//! straight off the strings. Every scripted call takes a few milliseconds so
//! latency totals are non-trivial.

use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tyrell::prelude::*;
use tyrell::summarizer::InferenceMethod;

const DATE: &str = "2024-05-01";
const CALL_LATENCY: Duration = Duration::from_millis(3);

struct CharTokenizer;

impl Tokenizer for CharTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>, String> {
        Ok(text.chars().map(String::from).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Oneshot {
        document: String,
    },
    Chunk {
        chunk: String,
        prior_summary: String,
        chunk_no: usize,
        total_chunks: usize,
    },
    Compress {
        original: String,
    },
    Final {
        summary: String,
    },
}

type Script = Box<dyn Fn(&Call) -> Result<String, String> + Send + Sync>;

/// Answers each call from a closure and records it.
struct ScriptedInference {
    script: Script,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedInference {
    fn new(script: impl Fn(&Call) -> Result<String, String> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, date: &str, call: Call) -> InferenceFuture<'_> {
        assert_eq!(date, DATE);
        let result = (self.script)(&call);
        self.calls.lock().unwrap().push(call);
        Box::pin(async move {
            tokio::time::sleep(CALL_LATENCY).await;
            result
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }
}

impl Inference for ScriptedInference {
    fn summarize_oneshot<'a>(&'a self, date: &'a str, document: &'a str) -> InferenceFuture<'a> {
        self.record(
            date,
            Call::Oneshot {
                document: document.to_string(),
            },
        )
    }

    fn summarize_chunk<'a>(&'a self, request: ChunkRequest<'a>) -> InferenceFuture<'a> {
        self.record(
            request.date,
            Call::Chunk {
                chunk: request.chunk.to_string(),
                prior_summary: request.prior_summary.to_string(),
                chunk_no: request.chunk_no,
                total_chunks: request.total_chunks,
            },
        )
    }

    fn compress<'a>(&'a self, date: &'a str, original: &'a str) -> InferenceFuture<'a> {
        self.record(
            date,
            Call::Compress {
                original: original.to_string(),
            },
        )
    }

    fn summarize_final<'a>(&'a self, date: &'a str, summary: &'a str) -> InferenceFuture<'a> {
        self.record(
            date,
            Call::Final {
                summary: summary.to_string(),
            },
        )
    }
}

async fn run(
    inference: &ScriptedInference,
    document: &str,
    config: SummarizerConfig,
) -> Result<SummaryResponse, SummarizeError> {
    let summarizer = Summarizer::new(inference, &CharTokenizer, config)
        .with_event_handler(&NoopHandler)
        .with_date(DATE);
    let lock = ModelLock::new();
    let permit = lock.acquire().await;
    summarizer.summarize(&permit, document).await
}

fn config(max_chunk: usize, budget: usize) -> SummarizerConfig {
    SummarizerConfig::default()
        .with_max_chunk_token_length(max_chunk)
        .with_max_final_summary_context_tokens(budget)
}

fn to_json(response: &SummaryResponse) -> Value {
    serde_json::to_value(response).unwrap()
}

fn methods(json: &Value) -> Vec<String> {
    json["inference_methods"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m.as_str().unwrap().to_string())
        .collect()
}

/// Sum of every latency recorded anywhere in a full response.
fn recorded_latency(json: &Value) -> u64 {
    assert!(
        json["summary_inference_time"].as_u64().unwrap() >= 3,
        "scripted calls should take measurable time"
    );
    let chunks: u64 = json["results"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|level| level.as_array().unwrap())
        .map(|r| r["inference_time"].as_u64().unwrap())
        .sum();
    let compressions: u64 = json["compressions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["inference_time"].as_u64().unwrap())
        .sum();
    chunks + compressions + json["summary_inference_time"].as_u64().unwrap()
}

fn is_chunk(call: &Call) -> bool {
    matches!(call, Call::Chunk { .. })
}

fn is_compress(call: &Call) -> bool {
    matches!(call, Call::Compress { .. })
}

fn is_final(call: &Call) -> bool {
    matches!(call, Call::Final { .. })
}

#[tokio::test]
async fn empty_document_makes_no_calls() {
    let inference = ScriptedInference::new(|_| Ok("unused".into()));
    let response = run(&inference, "", config(10, 20)).await.unwrap();

    assert_eq!(response.kind(), ResponseKind::Empty);
    assert_eq!(to_json(&response), serde_json::json!({"error": "Empty document."}));
    assert!(inference.calls().is_empty());
}

#[tokio::test]
async fn single_chunk_uses_oneshot_only() {
    let inference = ScriptedInference::new(|call| match call {
        Call::Oneshot { .. } => Ok("  the gist  ".into()),
        other => Err(format!("unexpected call {other:?}")),
    });
    let response = run(&inference, "abcd", config(10, 20)).await.unwrap();

    assert_eq!(response.kind(), ResponseKind::Oneshot);
    assert_eq!(
        inference.calls(),
        vec![Call::Oneshot {
            document: "abcd".into()
        }]
    );

    let json = to_json(&response);
    assert_eq!(json["summary"], "the gist");
    assert_eq!(json["results"][0]["id"], "0.1");
    assert_eq!(json["summaries"][0]["id"], 1);
    assert_eq!(json["summaries"][0]["length"], 8);
    assert!(json["total_inference_time"].as_u64().unwrap() >= 3);
    assert_eq!(
        json["total_inference_time"],
        json["results"][0]["inference_time"]
    );
    for absent in ["compressions", "resummarized", "compressed", "inference_methods"] {
        assert!(json.get(absent).is_none(), "{absent} should be absent");
    }
}

#[tokio::test]
async fn under_budget_skips_the_loop() {
    let inference = ScriptedInference::new(|call| match call {
        Call::Chunk { chunk_no, .. } => Ok(format!("s{chunk_no}")),
        Call::Final { .. } => Ok("final".into()),
        other => Err(format!("unexpected call {other:?}")),
    });
    let response = run(&inference, "aaaaabbbbb", config(5, 20)).await.unwrap();
    let json = to_json(&response);

    assert_eq!(response.kind(), ResponseKind::Full);
    assert_eq!(json["resummarized"], false);
    assert_eq!(json["compressed"], false);
    assert_eq!(methods(&json), vec!["initial-summary", "final-summary"]);
    assert_eq!(inference.count(is_compress), 0);
    assert_eq!(json["results"].as_array().unwrap().len(), 1);
    assert_eq!(json["summaries"][0]["summary"], "s1\n\ns2");
    assert_eq!(json["summaries"][1]["summary"], "final");
    assert_eq!(json["response"], "final");
    assert_eq!(
        json["total_inference_time"].as_u64().unwrap(),
        recorded_latency(&json)
    );
}

#[tokio::test]
async fn chunks_run_in_order_with_prior_summary() {
    let inference = ScriptedInference::new(|call| match call {
        Call::Chunk { chunk_no, .. } => Ok(format!("summary {chunk_no}")),
        Call::Final { .. } => Ok("final".into()),
        other => Err(format!("unexpected call {other:?}")),
    });
    run(&inference, "aaaaabbbbbccccc", config(5, 100))
        .await
        .unwrap();

    let chunks: Vec<Call> = inference.calls().into_iter().filter(is_chunk).collect();
    assert_eq!(
        chunks,
        vec![
            Call::Chunk {
                chunk: "aaaaa".into(),
                prior_summary: String::new(),
                chunk_no: 1,
                total_chunks: 3,
            },
            Call::Chunk {
                chunk: "bbbbb".into(),
                prior_summary: "summary 1".into(),
                chunk_no: 2,
                total_chunks: 3,
            },
            Call::Chunk {
                chunk: "ccccc".into(),
                prior_summary: "summary 2".into(),
                chunk_no: 3,
                total_chunks: 3,
            },
        ]
    );
    assert!(matches!(inference.calls().last(), Some(Call::Final { .. })));
}

#[tokio::test]
async fn final_context_labels_survivors() {
    let inference = ScriptedInference::new(|call| match call {
        Call::Chunk { chunk_no, .. } => Ok(format!("part {chunk_no}")),
        Call::Final { .. } => Ok("final".into()),
        other => Err(format!("unexpected call {other:?}")),
    });
    run(&inference, "aaaaabbbbb", config(5, 100)).await.unwrap();

    let finals: Vec<Call> = inference.calls().into_iter().filter(is_final).collect();
    assert_eq!(
        finals,
        vec![Call::Final {
            summary: "\n\nChunk (1 of 2):\npart 1\n\nChunk (2 of 2):\npart 2".into()
        }]
    );
}

#[tokio::test]
async fn slight_overage_is_left_alone() {
    // 10 + 11 = 21 tokens against 20: factor 1.05.
    let inference = ScriptedInference::new(|call| match call {
        Call::Chunk { chunk_no: 1, .. } => Ok("x".repeat(10)),
        Call::Chunk { .. } => Ok("y".repeat(11)),
        Call::Final { .. } => Ok("final".into()),
        other => Err(format!("unexpected call {other:?}")),
    });
    let response = run(&inference, "aaaaabbbbb", config(5, 20)).await.unwrap();
    let json = to_json(&response);

    assert_eq!(inference.count(is_compress), 0);
    assert_eq!(json["compressed"], false);
    assert_eq!(json["resummarized"], false);
    assert_eq!(methods(&json), vec!["initial-summary", "final-summary"]);
    assert!(inference.calls().contains(&Call::Final {
        summary: format!(
            "\n\nChunk (1 of 2):\n{}\n\nChunk (2 of 2):\n{}",
            "x".repeat(10),
            "y".repeat(11)
        )
    }));
}

#[tokio::test]
async fn moderate_overage_compresses_once() {
    // 11 + 12 = 23 tokens against 20: factor 1.15. Compression halves each.
    let inference = ScriptedInference::new(|call| match call {
        Call::Chunk { chunk_no: 1, .. } => Ok("x".repeat(11)),
        Call::Chunk { .. } => Ok("y".repeat(12)),
        Call::Compress { original } => {
            let half = original.chars().count() / 2;
            Ok(original.chars().take(half).collect())
        }
        Call::Final { .. } => Ok("final".into()),
        other => Err(format!("unexpected call {other:?}")),
    });
    let response = run(&inference, "aaaaabbbbb", config(5, 20)).await.unwrap();
    let json = to_json(&response);

    assert_eq!(inference.count(is_compress), 2);
    assert_eq!(json["compressed"], true);
    assert_eq!(json["resummarized"], false);
    assert_eq!(
        methods(&json),
        vec!["initial-summary", "compression", "final-summary"]
    );

    let compressions = json["compressions"].as_array().unwrap();
    assert_eq!(compressions.len(), 1);
    assert_eq!(
        compressions[0]["source"],
        serde_json::json!(["x".repeat(11), "y".repeat(12)])
    );
    assert_eq!(
        compressions[0]["result"],
        serde_json::json!(["x".repeat(5), "y".repeat(6)])
    );

    // No new level for a compression pass.
    assert_eq!(json["results"].as_array().unwrap().len(), 1);
    let summaries = json["summaries"].as_array().unwrap();
    assert_eq!(summaries.len(), 3);
    assert_eq!(summaries[1]["summary"], format!("{}\n\n{}", "x".repeat(5), "y".repeat(6)));
    assert_eq!(
        json["total_inference_time"].as_u64().unwrap(),
        recorded_latency(&json)
    );
}

#[tokio::test]
async fn large_overage_resummarizes_into_new_level() {
    // 13 + 13 = 26 tokens against 20: factor 1.3.
    let inference = ScriptedInference::new(|call| match call {
        Call::Chunk { chunk, .. } if chunk.starts_with('a') => Ok("b".repeat(13)),
        Call::Chunk { .. } => Ok("z".into()),
        Call::Final { .. } => Ok("final".into()),
        other => Err(format!("unexpected call {other:?}")),
    });
    let response = run(&inference, "aaaaaaaaaa", config(5, 20)).await.unwrap();
    let json = to_json(&response);

    assert_eq!(json["resummarized"], true);
    assert_eq!(json["compressed"], false);
    assert_eq!(
        methods(&json),
        vec!["initial-summary", "full-resummary", "final-summary"]
    );

    // The joined level-0 output is 28 tokens; max 5 plans 6 chunks of 4,
    // which the greedy split turns into 7.
    let levels = json["results"].as_array().unwrap();
    assert_eq!(levels.len(), 2);
    let level_one: Vec<&str> = levels[1]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(level_one, vec!["1.1", "1.2", "1.3", "1.4", "1.5", "1.6", "1.7"]);

    let level_one_chunks: Vec<Call> = inference
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Chunk { chunk, .. } if !chunk.starts_with('a')))
        .collect();
    let rejoined: String = level_one_chunks
        .iter()
        .map(|c| match c {
            Call::Chunk { chunk, .. } => chunk.as_str(),
            _ => "",
        })
        .collect();
    assert_eq!(rejoined, format!("{0}\n\n{0}", "b".repeat(13)));

    // Context carry restarts at the new level.
    assert!(matches!(
        &level_one_chunks[0],
        Call::Chunk { prior_summary, chunk_no: 1, total_chunks: 7, .. } if prior_summary.is_empty()
    ));
    assert!(matches!(
        &level_one_chunks[1],
        Call::Chunk { prior_summary, .. } if prior_summary == "z"
    ));

    assert_eq!(inference.count(is_compress), 0);
    assert_eq!(inference.count(is_final), 1);
    assert_eq!(
        json["total_inference_time"].as_u64().unwrap(),
        recorded_latency(&json)
    );
}

#[tokio::test]
async fn resummary_then_compression_then_stop() {
    // Level 0: 13 + 13 = 26 against 20, factor 1.3, so a full resummary.
    // Level 1: seven chunks answering 4 + 4 + 3 * 5 = 23, factor 1.15, so
    // one compression. Compressing to two characters each leaves 14.
    let inference = ScriptedInference::new(|call| match call {
        Call::Chunk { chunk, .. } if chunk.contains(['a', 'b']) => Ok("m".repeat(13)),
        Call::Chunk { chunk_no, .. } if *chunk_no <= 2 => Ok("pppp".into()),
        Call::Chunk { .. } => Ok("ppp".into()),
        Call::Compress { original } => Ok(original.chars().take(2).collect()),
        Call::Final { .. } => Ok("final".into()),
        other => Err(format!("unexpected call {other:?}")),
    });
    let response = run(&inference, "aaaaabbbbb", config(5, 20)).await.unwrap();
    let json = to_json(&response);

    assert_eq!(
        methods(&json),
        vec!["initial-summary", "full-resummary", "compression", "final-summary"]
    );
    assert_eq!(json["resummarized"], true);
    assert_eq!(json["compressed"], true);

    // Compression works on level 1 in place; no level 2 appears.
    let levels = json["results"].as_array().unwrap();
    assert_eq!(levels.len(), 2);
    assert_eq!(levels[1].as_array().unwrap().len(), 7);
    assert_eq!(levels[1][6]["id"], "1.7");

    let level_one: Vec<Value> = levels[1]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["response"].clone())
        .collect();
    let compressions = json["compressions"].as_array().unwrap();
    assert_eq!(compressions.len(), 1);
    assert_eq!(compressions[0]["source"], Value::Array(level_one));
    assert_eq!(compressions[0]["result"], serde_json::json!(vec!["pp"; 7]));

    let summaries = json["summaries"].as_array().unwrap();
    assert_eq!(summaries.len(), 4);
    assert_eq!(summaries[2]["summary"], vec!["pp"; 7].join("\n\n"));
    assert_eq!(summaries[3]["summary"], "final");

    assert_eq!(inference.count(is_chunk), 9);
    assert_eq!(inference.count(is_compress), 7);
    assert_eq!(inference.count(is_final), 1);
    assert!(inference.calls().contains(&Call::Final {
        summary: (1..=7)
            .map(|i| format!("\n\nChunk ({i} of 7):\npp"))
            .collect(),
    }));

    let total = json["total_inference_time"].as_u64().unwrap();
    assert!(total >= 3 * 17);
    assert_eq!(total, recorded_latency(&json));
}

#[tokio::test]
async fn stalled_compression_stops_the_loop() {
    let inference = ScriptedInference::new(|call| match call {
        Call::Chunk { chunk_no: 1, .. } => Ok("x".repeat(11)),
        Call::Chunk { .. } => Ok("y".repeat(12)),
        Call::Compress { original } => Ok(original.clone()),
        Call::Final { .. } => Ok("final".into()),
        other => Err(format!("unexpected call {other:?}")),
    });
    let response = run(&inference, "aaaaabbbbb", config(5, 20)).await.unwrap();
    let json = to_json(&response);

    assert_eq!(json["compressions"].as_array().unwrap().len(), 1);
    assert_eq!(inference.count(is_final), 1);
    assert_eq!(
        methods(&json),
        vec!["initial-summary", "compression", "final-summary"]
    );
}

#[tokio::test]
async fn pass_limit_bounds_the_loop() {
    // 60 + 60 = 120 against 100 stays in the compression band while each
    // pass trims one character per summary.
    let inference = ScriptedInference::new(|call| match call {
        Call::Chunk { .. } => Ok("x".repeat(60)),
        Call::Compress { original } => {
            let keep = original.chars().count() - 1;
            Ok(original.chars().take(keep).collect())
        }
        Call::Final { .. } => Ok("final".into()),
        other => Err(format!("unexpected call {other:?}")),
    });
    let response = run(
        &inference,
        "aaaaabbbbb",
        config(5, 100).with_max_budget_passes(2),
    )
    .await
    .unwrap();
    let json = to_json(&response);

    assert_eq!(json["compressions"].as_array().unwrap().len(), 2);
    assert_eq!(
        methods(&json),
        vec!["initial-summary", "compression", "compression", "final-summary"]
    );
}

#[tokio::test]
async fn inference_failure_aborts_the_request() {
    let inference = ScriptedInference::new(|call| match call {
        Call::Chunk { chunk_no: 2, .. } => Err("HTTP 503".into()),
        Call::Chunk { .. } => Ok("ok".into()),
        _ => Ok("unused".into()),
    });
    let err = run(&inference, "aaaaabbbbbccccc", config(5, 20))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SummarizeError::Inference {
            op: InferenceOp::SummarizeChunk,
            ..
        }
    ));
    assert!(err.to_string().contains("HTTP 503"));
    assert_eq!(inference.calls().len(), 2);
    assert_eq!(inference.count(is_final), 0);
}

#[tokio::test]
async fn invalid_config_is_rejected_before_any_call() {
    let inference = ScriptedInference::new(|_| Ok("unused".into()));
    let err = run(&inference, "abcd", config(0, 20)).await.unwrap_err();
    assert!(matches!(err, SummarizeError::InvalidConfig(_)));
    assert!(inference.calls().is_empty());
}

#[tokio::test]
async fn events_report_each_stage() {
    let inference = ScriptedInference::new(|call| match call {
        Call::Chunk { chunk_no: 1, .. } => Ok("x".repeat(11)),
        Call::Chunk { .. } => Ok("y".repeat(12)),
        Call::Compress { original } => Ok(original.chars().take(3).collect()),
        Call::Final { .. } => Ok("final".into()),
        other => Err(format!("unexpected call {other:?}")),
    });
    let stages = Mutex::new(Vec::new());
    let handler = FnEventHandler::new(|event| {
        if let SummaryEvent::StageCompleted { method, .. } = event {
            stages.lock().unwrap().push(*method);
        }
    });

    let summarizer = Summarizer::new(&inference, &CharTokenizer, config(5, 20))
        .with_event_handler(&handler)
        .with_date(DATE);
    let lock = ModelLock::new();
    let permit = lock.acquire().await;
    summarizer.summarize(&permit, "aaaaabbbbb").await.unwrap();

    assert_eq!(
        *stages.lock().unwrap(),
        vec![
            InferenceMethod::InitialSummary,
            InferenceMethod::Compression,
            InferenceMethod::FinalSummary,
        ]
    );
}
