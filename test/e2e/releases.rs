//! End-to-end releases scenario.
//!
//! Drives the platform CLI against a live cluster:
//!
//! 1. Log in, clone the example app, create it and push it
//! 2. Set a config value (creates a new release)
//! 3. Wait for the release to show up in `releases list`
//! 4. Inspect it, roll back, and open the app
//! 5. Wait for the rollback release to show up
//! 6. Destroy the app (always, even if a step failed)
//!
//! ## Running
//!
//! ```bash
//! PLFM_ITEST_LIVE=1 PLFM_ITEST_DOMAIN=dev.example.com \
//!     cargo test -p plfm-e2e --test releases -- --ignored
//! ```

use std::time::Duration;

use plfm_catalog::CommandCatalog;
use plfm_context::{ConfigContext, Field, FieldValue};
use plfm_converge::RetryPolicy;
use plfm_harness::{
    logging, unique_name, Executor, ExecutorConfig, HarnessError, Presence, Scenario,
    TokenMatch,
};
use tracing::info;

/// Every (resource, action) the scenario touches.
const STEPS: &[(&str, &str)] = &[
    ("auth", "login"),
    ("git", "clone"),
    ("apps", "create"),
    ("git", "push"),
    ("config", "set"),
    ("releases", "list"),
    ("releases", "info"),
    ("releases", "rollback"),
    ("apps", "open"),
    ("apps", "destroy"),
];

fn live_cluster_enabled() -> bool {
    std::env::var("PLFM_ITEST_LIVE").is_ok_and(|v| v == "1")
}

fn release_token(ctx: &ConfigContext) -> Result<String, HarnessError> {
    match ctx.get(Field::Version) {
        Some(FieldValue::Integer(version)) => Ok(format!("v{version}")),
        Some(other) => Ok(format!("v{}", other.render(","))),
        None => Err(HarnessError::UnsetField(Field::Version)),
    }
}

#[test]
fn scenario_commands_render_from_defaults() {
    logging::init_test_tracing();
    let catalog = CommandCatalog::builtin().unwrap();
    let mut ctx = ConfigContext::with_defaults();
    ctx.set(Field::AppName, unique_name("releases"));

    for (resource, action) in STEPS {
        let command = catalog.resolve(resource, action, &ctx).unwrap();
        info!(%resource, %action, %command, "rendered");
        assert!(!command.contains("{{"), "{command}");
    }

    ctx.set(Field::Version, 4);
    assert_eq!(release_token(&ctx).unwrap(), "v4");
    assert!(catalog
        .resolve("releases", "rollback", &ctx)
        .unwrap()
        .contains("v4"));
}

#[tokio::test]
#[ignore = "needs a live cluster and the platform CLI; set PLFM_ITEST_LIVE=1"]
async fn releases_list_info_rollback() {
    if !live_cluster_enabled() {
        eprintln!("PLFM_ITEST_LIVE is not 1; skipping");
        return;
    }
    logging::init_test_tracing();

    let catalog = CommandCatalog::builtin().unwrap();
    let mut ctx = ConfigContext::from_env().unwrap();
    ctx.set(Field::AppName, unique_name("releases"));

    let workdir = tempfile::tempdir().unwrap();
    let app_dir = match ctx.get(Field::ExampleApp) {
        Some(example) => workdir.path().join(example.render(",")),
        None => panic!("example_app must be set"),
    };

    let policy = RetryPolicy::new(Duration::from_secs(2), Duration::from_secs(180)).unwrap();
    let executor = Executor::new(ExecutorConfig::from_env().unwrap());
    let mut scenario = Scenario::new("releases", catalog, ctx)
        .with_executor(executor)
        .with_policy(policy)
        .with_token_match(TokenMatch::Word);

    let body = async {
        info!("logging in and deploying the example app");
        scenario.run("auth", "login", false, "").await?;

        scenario.set_working_dir(workdir.path());
        scenario.run("git", "clone", false, "").await?;

        scenario.set_working_dir(&app_dir);
        scenario.run("apps", "create", false, "").await?;
        scenario.run("git", "push", false, "").await?;

        scenario.set_working_dir(workdir.path());
        scenario.run("config", "set", false, "").await?;

        let token = release_token(scenario.context())?;
        info!(%token, "waiting for the config release");
        scenario
            .wait_for_token("releases", "list", &token, Presence::Present)
            .await?;
        scenario.run("releases", "info", false, "").await?;
        scenario.run("releases", "rollback", false, "").await?;
        scenario.run("apps", "open", false, "").await?;

        scenario.set(Field::Version, 4);
        let token = release_token(scenario.context())?;
        info!(%token, "waiting for the rollback release");
        scenario
            .wait_for_token("releases", "list", &token, Presence::Present)
            .await?;
        Ok::<(), HarnessError>(())
    }
    .await;

    info!("destroying the app");
    scenario.cleanup("apps", "destroy").await;

    let report = scenario.finish(body);
    if let Err(failed) = report.into_result() {
        panic!("{failed}");
    }
}
