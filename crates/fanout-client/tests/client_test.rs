// Integration tests for the build client against a coordinator and workers

use std::sync::Arc;

use fanout_client::BuildClient;
use fanout_common::transport::TcpServer;
use fanout_common::BuildTask;
use fanout_coordinator::{BuildCoordinator, CoordinatorConfig};
use fanout_worker::{Compiler, CompilerOutput, Worker, FAILURE_MARKER, SUCCESS_MARKER};
use futures::future::BoxFuture;
use serde_json::json;

/// Fails any source whose name starts with "bad".
struct PickyCompiler;

impl Compiler for PickyCompiler {
    fn compile(&self, task: &BuildTask) -> BoxFuture<'static, std::io::Result<CompilerOutput>> {
        let success = !task.source.starts_with("bad");
        let output = format!("{} {}", task.language, task.source);
        Box::pin(async move { Ok(CompilerOutput { output, success }) })
    }
}

async fn start_cluster(workers: usize) -> String {
    let mut addrs = Vec::new();
    for _ in 0..workers {
        let server = TcpServer::new("127.0.0.1:0").await.unwrap();
        addrs.push(server.local_addr().unwrap().to_string());
        tokio::spawn(Worker::new(PickyCompiler).serve(server));
    }

    let coordinator = Arc::new(BuildCoordinator::new(addrs, CoordinatorConfig::default()).unwrap());
    let server = TcpServer::new("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap().to_string();
    tokio::spawn(coordinator.serve(server));
    addr
}

#[tokio::test]
async fn test_build_through_coordinator() {
    let client = BuildClient::new(start_cluster(2).await);

    let ok = client.build(&BuildTask::new("C++", "main.cpp")).await.unwrap();
    assert_eq!(ok.output, format!("C++ main.cpp\n{}", SUCCESS_MARKER));

    let failed = client.build(&BuildTask::new("C", "bad.c")).await.unwrap();
    assert_eq!(failed.output, format!("C bad.c\n{}", FAILURE_MARKER));
}

#[tokio::test]
async fn test_parallel_builds_share_one_client() {
    let client = BuildClient::new(start_cluster(3).await);

    let builds = (0..12).map(|n| {
        let client = client.clone();
        async move { client.build(&BuildTask::new("C", format!("f{}.c", n))).await }
    });
    let results = futures::future::join_all(builds).await;

    assert!(results
        .into_iter()
        .all(|result| result.unwrap().output.ends_with(SUCCESS_MARKER)));
}

#[tokio::test]
async fn test_metrics_after_builds() {
    let client = BuildClient::new(start_cluster(2).await);
    for n in 0..4 {
        client.build(&BuildTask::new("C", format!("f{}.c", n))).await.unwrap();
    }

    let metrics = client.call("_metrics", json!({})).await.unwrap();
    assert_eq!(metrics["total_requests"], 4);
    assert_eq!(metrics["endpoints"][0]["dispatched"], 2);
    assert_eq!(metrics["endpoints"][1]["dispatched"], 2);
}

#[tokio::test]
async fn test_unknown_method_is_error() {
    let client = BuildClient::new(start_cluster(1).await);
    let err = client.call("link", json!({})).await.unwrap_err();
    assert!(err.to_string().contains("Unknown method: link"));
}
