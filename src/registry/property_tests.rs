//! Property-based tests for the commit protocol.
//!
//! # Tested Invariants
//!
//! - Any sequence of upserts leaves exactly one live row per path, carrying
//!   the blob from the most recent upsert
//! - Finalize removes every row from other deployments and nothing else
//! - Finalize returns exactly the blobs of the rows it removed
//! - A second finalize with no upserts in between returns nothing

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use super::{AssetRegistry, DeploymentId};
use crate::blob::BlobId;

// ============================================================================
// Test Strategies - Input Generation
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Upsert { path: usize, deployment: usize },
    Finalize { deployment: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..6, 0usize..3).prop_map(|(path, deployment)| Op::Upsert { path, deployment }),
        1 => (0usize..3).prop_map(|deployment| Op::Finalize { deployment }),
    ]
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op_strategy(), 0..60)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn path_name(i: usize) -> String {
    format!("/p{i}.js")
}

fn deployment_name(i: usize) -> DeploymentId {
    DeploymentId::new(format!("d{i}"))
}

// ============================================================================
// Model Check
// ============================================================================

proptest! {
    /// The registry tracks a simple path -> (blob, deployment) model exactly.
    #[test]
    fn registry_matches_model(ops in ops_strategy()) {
        let rt = runtime();
        let registry = AssetRegistry::memory();
        let mut model: HashMap<String, (BlobId, DeploymentId)> = HashMap::new();

        for (n, op) in ops.into_iter().enumerate() {
            match op {
                Op::Upsert { path, deployment } => {
                    let path = path_name(path);
                    let blob = BlobId::new(format!("blob-{n}"));
                    let dep = deployment_name(deployment);
                    let old = rt
                        .block_on(registry.upsert_path(&path, blob.clone(), "text/javascript", &dep))
                        .unwrap();
                    let expected_old = model.insert(path, (blob, dep)).map(|(b, _)| b);
                    prop_assert_eq!(old, expected_old);
                },
                Op::Finalize { deployment } => {
                    let dep = deployment_name(deployment);
                    let stale = rt.block_on(registry.finalize_deployment(&dep)).unwrap();

                    let expected: HashSet<BlobId> = model
                        .values()
                        .filter(|(_, d)| d != &dep)
                        .map(|(b, _)| b.clone())
                        .collect();
                    model.retain(|_, (_, d)| d == &dep);

                    prop_assert_eq!(stale.len(), expected.len());
                    prop_assert_eq!(stale.into_iter().collect::<HashSet<_>>(), expected);

                    let again = rt.block_on(registry.finalize_deployment(&dep)).unwrap();
                    prop_assert!(again.is_empty());
                },
            }

            let live = rt.block_on(registry.list_assets(Some(usize::MAX))).unwrap();
            prop_assert_eq!(live.len(), model.len());
            let mut seen = HashSet::new();
            for asset in &live {
                prop_assert!(seen.insert(asset.path.clone()), "duplicate live row at {}", asset.path);
                let (blob, dep) = &model[&asset.path];
                prop_assert_eq!(&asset.blob_id, blob);
                prop_assert_eq!(&asset.deployment_id, dep);
            }
        }
    }
}
