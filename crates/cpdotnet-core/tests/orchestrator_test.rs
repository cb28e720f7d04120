#![allow(clippy::unwrap_used)]
// Integration tests for `Orchestrator` against a fake command runner and
// a host layout inside a temp directory.

mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;

use common::{DOMAIN, Host};
use cpdotnet_core::{
    Command, CoreError, DeploymentKind, HubPath, Mode, Submission, UnitState, proxy,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn enable(domain: &str) -> Command {
    Command::Enable {
        domain: domain.into(),
        entry_assembly: "App.dll".into(),
        port: None,
    }
}

fn deploy(domain: &str, source: &std::path::Path) -> Command {
    Command::Deploy {
        domain: domain.into(),
        source: Some(source.to_path_buf()),
    }
}

fn signalr(state: &str, hubs: &[&str]) -> Command {
    Command::SignalrToggle {
        domain: DOMAIN.into(),
        state: state.into(),
        hubs: hubs.iter().map(|h| (*h).to_owned()).collect(),
    }
}

fn hub_paths(hubs: &[HubPath]) -> Vec<&str> {
    hubs.iter().map(HubPath::as_str).collect()
}

// ── Enable ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_enable_creates_unit_and_fragment() {
    let host = Host::new();

    let report = host.orchestrator.execute(enable(DOMAIN)).await.unwrap();

    assert!(report.ok);
    assert_eq!(report.cmd, "enable example.com --dll App.dll");
    let site = report.site.unwrap();
    assert_eq!(site.mode, Mode::Dotnet);
    assert_eq!(site.listen_port, Some(5000));

    let unit = host.unit_file(DOMAIN).unwrap();
    assert!(unit.contains("Environment=ASPNETCORE_URLS=http://127.0.0.1:5000"));
    assert!(host.fragment(DOMAIN).unwrap().contains("proxy_pass http://127.0.0.1:5000;"));

    assert_eq!(
        report.commands,
        vec![
            "systemctl daemon-reload",
            "systemctl enable dotnet-example.com",
            "nginx -s reload",
        ]
    );
    // No release yet, so nothing is started.
    assert!(!host.runner.calls().iter().any(|c| c.contains("start")));
}

#[tokio::test]
async fn test_invalid_domains_never_reach_external_commands() {
    let host = Host::new();

    for raw in ["", "bad/domain", "bad domain", "-bad.com"] {
        let failure = host.orchestrator.execute(enable(raw)).await.unwrap_err();
        assert!(!failure.report.ok);
        assert_eq!(failure.report.code, 2, "domain {raw:?}");
        assert!(failure.report.commands.is_empty());
        assert!(matches!(failure.error, CoreError::InvalidInput { .. }));
    }

    assert!(host.runner.calls().is_empty());
    assert!(host.orchestrator.sites().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_entry_assembly_is_rejected() {
    let host = Host::new();
    let failure = host
        .orchestrator
        .execute(Command::Enable {
            domain: DOMAIN.into(),
            entry_assembly: "App.exe".into(),
            port: None,
        })
        .await
        .unwrap_err();

    assert_eq!(failure.report.code, 2);
    assert!(host.runner.calls().is_empty());
}

#[tokio::test]
async fn test_reload_failure_on_new_site_leaves_no_trace() {
    let host = Host::new();
    host.runner.fail_on("nginx", 1, "nginx: [emerg] bad config");

    let failure = host.orchestrator.execute(enable(DOMAIN)).await.unwrap_err();

    assert!(matches!(failure.error, CoreError::Service { .. }));
    assert!(failure.report.stderr.contains("nginx: [emerg] bad config"));
    assert!(host.orchestrator.sites().unwrap().is_empty());
    assert!(host.fragment(DOMAIN).is_none());
    assert!(host.unit_file(DOMAIN).is_none());

    // The unit was written and enabled before the reload failed, so it is
    // disabled again as part of the undo.
    assert_eq!(
        failure.report.commands,
        vec![
            "systemctl daemon-reload",
            "systemctl enable dotnet-example.com",
            "nginx -s reload",
            "nginx -s reload",
            "systemctl disable dotnet-example.com",
            "systemctl daemon-reload",
        ]
    );
}

#[tokio::test]
async fn test_unit_failure_on_new_site_removes_unit_file() {
    let host = Host::new();
    host.runner.fail_on("enable dotnet-", 1, "Failed to enable unit");

    let failure = host.orchestrator.execute(enable(DOMAIN)).await.unwrap_err();

    assert_eq!(failure.report.code, 1);
    assert!(host.orchestrator.sites().unwrap().is_empty());
    assert!(host.unit_file(DOMAIN).is_none());
    assert!(host.fragment(DOMAIN).is_none());
    assert!(host.runner.called("systemctl disable dotnet-example.com"));
}

#[tokio::test]
async fn test_failed_change_to_existing_site_keeps_its_unit() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();
    let unit_before = host.unit_file(DOMAIN).unwrap();

    host.runner.fail_on("nginx", 1, "nginx: [emerg] bad config");
    host.orchestrator
        .execute(Command::Enable {
            domain: DOMAIN.into(),
            entry_assembly: "Other.dll".into(),
            port: None,
        })
        .await
        .unwrap_err();

    assert_eq!(host.unit_file(DOMAIN).unwrap(), unit_before);
    assert!(!host.runner.calls().iter().any(|c| c.contains("disable")));
    assert_eq!(host.orchestrator.site(DOMAIN).unwrap().entry_assembly.as_str(), "App.dll");
}

#[tokio::test]
async fn test_requested_port_conflict() {
    let host = Host::new();
    host.orchestrator.execute(enable("a.com")).await.unwrap();

    let failure = host
        .orchestrator
        .execute(Command::Enable {
            domain: "b.com".into(),
            entry_assembly: "App.dll".into(),
            port: Some(5000),
        })
        .await
        .unwrap_err();

    assert_eq!(failure.report.code, 6);
    assert!(host.fragment("b.com").is_none());
}

// ── Deploy & rollback ───────────────────────────────────────────────

#[tokio::test]
async fn test_enable_then_deploy_records_previous_version_and_restarts() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();

    let v1 = host.build("v1");
    let first = host.orchestrator.execute(deploy(DOMAIN, &v1)).await.unwrap();
    let first = first.deployment.unwrap();
    assert_eq!(first.previous_version_ref, None);
    assert_eq!(first.source_path, v1);

    host.runner.reset_calls();
    let v2 = host.build("v2");
    let report = host.orchestrator.execute(deploy(DOMAIN, &v2)).await.unwrap();
    let second = report.deployment.unwrap();

    assert_eq!(second.kind, DeploymentKind::Deploy);
    assert_eq!(second.previous_version_ref, Some(first.release_path.clone()));
    assert_eq!(host.live_target(DOMAIN), second.release_path);
    assert_eq!(
        std::fs::read(host.live_dir(DOMAIN).join("App.dll")).unwrap(),
        b"v2"
    );
    assert!(host.runner.called("systemctl restart dotnet-example.com"));
    assert_eq!(report.site.unwrap().source_path, Some(v2));
}

#[tokio::test]
async fn test_deploy_reuses_last_source() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();

    let missing = host
        .orchestrator
        .execute(Command::Deploy {
            domain: DOMAIN.into(),
            source: None,
        })
        .await
        .unwrap_err();
    assert_eq!(missing.report.code, 2);

    let v1 = host.build("v1");
    host.orchestrator.execute(deploy(DOMAIN, &v1)).await.unwrap();
    let again = host
        .orchestrator
        .execute(Command::Deploy {
            domain: DOMAIN.into(),
            source: None,
        })
        .await
        .unwrap();
    assert_eq!(again.deployment.unwrap().source_path, v1);
}

#[tokio::test]
async fn test_relative_source_is_rejected_without_side_effects() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();
    host.runner.reset_calls();

    let failure = host
        .orchestrator
        .execute(deploy(DOMAIN, std::path::Path::new("builds/v1")))
        .await
        .unwrap_err();

    assert_eq!(failure.report.code, 2);
    assert!(host.runner.calls().is_empty());
    assert_eq!(host.release_count(DOMAIN), 0);
}

#[tokio::test]
async fn test_forced_swap_failure_keeps_source_path() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();

    // A real, non-empty directory where the live link belongs makes the
    // rename of the new link fail.
    std::fs::create_dir_all(host.live_dir(DOMAIN)).unwrap();
    std::fs::write(host.live_dir(DOMAIN).join("keep.txt"), b"x").unwrap();

    let v1 = host.build("v1");
    let failure = host.orchestrator.execute(deploy(DOMAIN, &v1)).await.unwrap_err();

    assert!(matches!(failure.error, CoreError::Storage { .. }));
    let site = host.orchestrator.site(DOMAIN).unwrap();
    assert_eq!(site.source_path, None);
    assert!(host.orchestrator.deployments(DOMAIN).unwrap().is_empty());
    assert_eq!(host.release_count(DOMAIN), 0);
    assert!(!host.runner.calls().iter().any(|c| c.contains("restart")));
}

#[tokio::test]
async fn test_restart_failure_after_swap_is_restart_pending() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();
    host.runner.fail_on("restart", 1, "Job for dotnet-example.com.service failed");

    let v1 = host.build("v1");
    let failure = host.orchestrator.execute(deploy(DOMAIN, &v1)).await.unwrap_err();

    assert!(matches!(failure.error, CoreError::RestartPending { .. }));
    assert_eq!(failure.report.code, 1);
    assert!(failure.report.stderr.contains("Job for dotnet-example.com.service failed"));

    // The new files are live and recorded even though the restart failed.
    let record = failure.report.deployment.unwrap();
    assert_eq!(host.live_target(DOMAIN), record.release_path);
    assert_eq!(host.orchestrator.site(DOMAIN).unwrap().source_path, Some(v1));
}

#[tokio::test]
async fn test_rollback_returns_to_previous_release() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();
    let v1 = host.build("v1");
    let v2 = host.build("v2");
    let first = host.orchestrator.execute(deploy(DOMAIN, &v1)).await.unwrap();
    host.orchestrator.execute(deploy(DOMAIN, &v2)).await.unwrap();

    let report = host
        .orchestrator
        .execute(Command::Rollback {
            domain: DOMAIN.into(),
        })
        .await
        .unwrap();

    let record = report.deployment.unwrap();
    let first = first.deployment.unwrap();
    assert_eq!(record.kind, DeploymentKind::Rollback);
    assert_eq!(record.release_path, first.release_path);
    assert_eq!(record.source_path, v1);
    assert_eq!(host.live_target(DOMAIN), first.release_path);
    assert_eq!(host.orchestrator.deployments(DOMAIN).unwrap().len(), 3);
}

#[tokio::test]
async fn test_rollback_without_history_is_conflict() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();

    let failure = host
        .orchestrator
        .execute(Command::Rollback {
            domain: DOMAIN.into(),
        })
        .await
        .unwrap_err();
    assert_eq!(failure.report.code, 6);
}

#[tokio::test]
async fn test_old_releases_are_pruned() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();

    for name in ["v1", "v2", "v3", "v4"] {
        let build = host.build(name);
        host.orchestrator.execute(deploy(DOMAIN, &build)).await.unwrap();
    }

    // Retention is two: the live release and the one before it.
    assert_eq!(host.release_count(DOMAIN), 2);
    let history = host.orchestrator.deployments(DOMAIN).unwrap();
    let latest = history.last().unwrap();
    assert!(latest.release_path.is_dir());
    assert!(latest.previous_version_ref.as_ref().unwrap().is_dir());
}

// ── Mode switching ──────────────────────────────────────────────────

#[tokio::test]
async fn test_toggle_to_php_stops_unit_and_keeps_port() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();

    let report = host
        .orchestrator
        .execute(Command::ToggleMode {
            domain: DOMAIN.into(),
            mode: "PHP".into(),
        })
        .await
        .unwrap();

    let site = report.site.unwrap();
    assert_eq!(site.mode, Mode::Php);
    assert_eq!(site.listen_port, Some(5000));
    assert!(host.runner.called("systemctl stop dotnet-example.com"));
    let fragment = host.fragment(DOMAIN).unwrap();
    assert!(fragment.contains("fastcgi_pass"));
    assert!(!fragment.contains("proxy_pass"));
}

#[tokio::test]
async fn test_toggle_back_to_dotnet_restarts_live_release() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();
    let v1 = host.build("v1");
    host.orchestrator.execute(deploy(DOMAIN, &v1)).await.unwrap();
    host.orchestrator
        .execute(Command::ToggleMode {
            domain: DOMAIN.into(),
            mode: "php".into(),
        })
        .await
        .unwrap();
    host.runner.reset_calls();

    host.orchestrator
        .execute(Command::ToggleMode {
            domain: DOMAIN.into(),
            mode: "dotnet".into(),
        })
        .await
        .unwrap();

    assert!(host.runner.called("systemctl restart dotnet-example.com"));
    assert!(host.fragment(DOMAIN).unwrap().contains("proxy_pass http://127.0.0.1:5000;"));
}

#[tokio::test]
async fn test_toggle_invalid_mode_and_unknown_domain() {
    let host = Host::new();

    let failure = host
        .orchestrator
        .execute(Command::ToggleMode {
            domain: DOMAIN.into(),
            mode: "nodejs".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(failure.report.code, 2);

    let failure = host
        .orchestrator
        .execute(Command::ToggleMode {
            domain: DOMAIN.into(),
            mode: "php".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(failure.report.code, 4);
    assert!(host.runner.calls().is_empty());
}

#[tokio::test]
async fn test_restart_in_php_mode_is_invalid() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();
    host.orchestrator
        .execute(Command::ToggleMode {
            domain: DOMAIN.into(),
            mode: "php".into(),
        })
        .await
        .unwrap();

    let failure = host
        .orchestrator
        .execute(Command::Restart {
            domain: DOMAIN.into(),
        })
        .await
        .unwrap_err();
    assert_eq!(failure.report.code, 2);
}

#[tokio::test]
async fn test_restart_failure_surfaces_stderr_verbatim() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();
    host.runner.fail_on("restart", 5, "Unit dotnet-example.com.service not found.");

    let failure = host
        .orchestrator
        .execute(Command::Restart {
            domain: DOMAIN.into(),
        })
        .await
        .unwrap_err();

    assert_eq!(failure.report.code, 5);
    assert_eq!(failure.report.stderr, "Unit dotnet-example.com.service not found.");
    assert_eq!(failure.report.commands, vec!["systemctl restart dotnet-example.com"]);
    // Never retried.
    let restarts = host.runner.calls().iter().filter(|c| c.contains("restart")).count();
    assert_eq!(restarts, 1);
}

// ── Real-time hubs ──────────────────────────────────────────────────

#[tokio::test]
async fn test_signalr_on_renders_upgrade_routes_for_each_hub() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();
    host.runner.reset_calls();

    let report = host
        .orchestrator
        .execute(signalr("on", &["chat", "/notify"]))
        .await
        .unwrap();

    let site = report.site.unwrap();
    assert!(site.hubs_enabled);
    assert_eq!(hub_paths(&site.hubs), vec!["/chat", "/notify"]);

    let fragment = host.fragment(DOMAIN).unwrap();
    assert!(fragment.contains("location /chat {"));
    assert!(fragment.contains("location /notify {"));
    assert_eq!(fragment.matches("proxy_set_header Upgrade $http_upgrade;").count(), 2);

    // Only the web server is reloaded.
    assert_eq!(host.runner.calls(), vec!["nginx -s reload"]);
}

#[tokio::test]
async fn test_signalr_off_disables_regardless_of_hubs() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();
    host.orchestrator.execute(signalr("on", &["chat"])).await.unwrap();

    let report = host
        .orchestrator
        .execute(signalr("off", &["../etc", "anything"]))
        .await
        .unwrap();

    let site = report.site.unwrap();
    assert!(!site.hubs_enabled);
    assert_eq!(hub_paths(&site.hubs), vec!["/chat"]);
    assert!(!host.fragment(DOMAIN).unwrap().contains("Upgrade"));
}

#[tokio::test]
async fn test_signalr_on_without_hubs_is_accepted() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();
    host.orchestrator.execute(signalr("on", &["chat"])).await.unwrap();

    let site = host
        .orchestrator
        .execute(signalr("on", &[]))
        .await
        .unwrap()
        .site
        .unwrap();

    assert!(site.hubs_enabled);
    assert!(site.hubs.is_empty());
    assert!(!host.fragment(DOMAIN).unwrap().contains("location /chat"));
}

#[tokio::test]
async fn test_invalid_hub_names_offending_path_and_changes_nothing() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();
    host.orchestrator.execute(signalr("on", &["chat"])).await.unwrap();
    host.runner.reset_calls();

    let failure = host
        .orchestrator
        .execute(signalr("on", &["notify", "../etc"]))
        .await
        .unwrap_err();

    assert_eq!(failure.report.code, 2);
    assert!(failure.report.stderr.contains("/../etc"));
    assert!(host.runner.calls().is_empty());
    let site = host.orchestrator.site(DOMAIN).unwrap();
    assert_eq!(hub_paths(&site.hubs), vec!["/chat"]);
}

#[tokio::test]
async fn test_reload_failure_restores_previous_hubs() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();
    let before = host.fragment(DOMAIN).unwrap();
    host.runner.fail_on("nginx", 1, "reload refused");

    let failure = host
        .orchestrator
        .execute(signalr("on", &["chat"]))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, CoreError::Service { .. }));
    let site = host.orchestrator.site(DOMAIN).unwrap();
    assert!(!site.hubs_enabled);
    assert!(site.hubs.is_empty());
    assert_eq!(host.fragment(DOMAIN).unwrap(), before);
}

// ── Status, render, reconcile ───────────────────────────────────────

#[tokio::test]
async fn test_status_reports_state_and_recent_logs() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();

    let report = host
        .orchestrator
        .execute(Command::Status {
            domain: DOMAIN.into(),
            lines: Some(2),
        })
        .await
        .unwrap();

    let unit = report.unit.unwrap();
    assert_eq!(unit.unit.state, UnitState::Active);
    assert_eq!(unit.unit.unit_name, "dotnet-example.com");
    assert_eq!(
        unit.recent_log_lines,
        vec!["listening on http://127.0.0.1:5000", "ready"]
    );
    assert!(
        report
            .commands
            .contains(&"journalctl -u dotnet-example.com -n 2 --no-pager --output=cat".to_owned())
    );
}

#[tokio::test]
async fn test_status_of_unknown_domain_is_not_found() {
    let host = Host::new();
    let failure = host
        .orchestrator
        .execute(Command::Status {
            domain: DOMAIN.into(),
            lines: None,
        })
        .await
        .unwrap_err();
    assert_eq!(failure.report.code, 4);
    assert!(host.runner.calls().is_empty());
}

#[tokio::test]
async fn test_render_matches_applied_fragment() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();
    host.orchestrator.execute(signalr("on", &["chat"])).await.unwrap();

    let first = host.orchestrator.render(DOMAIN).unwrap();
    let second = proxy::render(
        &host.orchestrator.site(DOMAIN).unwrap(),
        &host.config.proxy,
    );
    assert_eq!(first, second);
    assert_eq!(Some(first.text), host.fragment(DOMAIN));
}

#[tokio::test]
async fn test_reconcile_rewrites_lost_projections() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();
    let fragment = host.fragment(DOMAIN).unwrap();
    std::fs::remove_file(host.config.proxy.vhost_dir.join("example.com.conf")).unwrap();

    // A fresh process sees the same registry.
    let reopened = host.reopen();
    reopened
        .execute(Command::Reconcile {
            domain: DOMAIN.into(),
        })
        .await
        .unwrap();

    assert_eq!(host.fragment(DOMAIN).unwrap(), fragment);
}

// ── Concurrency & deadlines ─────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_different_domains_run_in_parallel() {
    let host = Host::new();
    let (a, b) = tokio::join!(
        host.orchestrator.execute(enable("a.com")),
        host.orchestrator.execute(enable("b.com")),
    );

    let ports = [
        a.unwrap().site.unwrap().listen_port,
        b.unwrap().site.unwrap().listen_port,
    ];
    assert!(ports.contains(&Some(5000)));
    assert!(ports.contains(&Some(5001)));
}

#[tokio::test]
async fn test_two_processes_share_one_registry() {
    let host = Host::new();
    let other = host.reopen();

    let a = host.orchestrator.execute(enable("a.com")).await.unwrap();
    let b = other.execute(enable("b.com")).await.unwrap();

    assert_eq!(a.site.unwrap().listen_port, Some(5000));
    assert_eq!(b.site.unwrap().listen_port, Some(5001));

    // Each side sees the other's write without reopening.
    let seen: Vec<String> = host
        .orchestrator
        .sites()
        .unwrap()
        .iter()
        .map(|s| s.domain.to_string())
        .collect();
    assert_eq!(seen, vec!["a.com", "b.com"]);

    let fresh = host.reopen();
    assert_eq!(fresh.sites().unwrap().len(), 2);
    assert!(host.fragment("a.com").unwrap().contains("127.0.0.1:5000"));
    assert!(host.fragment("b.com").unwrap().contains("127.0.0.1:5001"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_interleaved_processes_never_share_a_port() {
    let host = Host::new();
    let other = host.reopen();
    host.runner.delay_on("nginx", Duration::from_millis(50));

    let (a, b) = tokio::join!(
        host.orchestrator.execute(enable("a.com")),
        other.execute(enable("b.com")),
    );
    a.unwrap();
    b.unwrap();

    let sites = host.reopen().sites().unwrap();
    assert_eq!(sites.len(), 2);
    assert_ne!(sites[0].listen_port, sites[1].listen_port);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_same_domain_from_two_processes_is_serialized() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();
    let other = host.reopen();
    host.runner.delay_on("restart", Duration::from_millis(100));
    host.runner.reset_calls();

    let restart = || Command::Restart {
        domain: DOMAIN.into(),
    };
    let started = std::time::Instant::now();
    let (a, b) = tokio::join!(
        host.orchestrator.execute(restart()),
        other.execute(restart()),
    );
    a.unwrap();
    b.unwrap();

    // One restart waits for the other to release the domain's lock file.
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(host.runner.calls().len(), 2);
    assert!(host.config.state_dir.join("locks/example.com.lock").is_file());
}

#[tokio::test]
async fn test_deadline_reports_pending_and_action_completes() {
    let host = Host::new();
    host.orchestrator.execute(enable(DOMAIN)).await.unwrap();
    host.runner.delay_on("restart", Duration::from_millis(300));
    let v1 = host.build("v1");

    let submission = host
        .orchestrator
        .submit(deploy(DOMAIN, &v1), Some(Duration::from_millis(10)))
        .await;

    let Submission::Pending(pending) = submission else {
        panic!("expected the deploy to outlive its deadline");
    };
    assert!(pending.action().starts_with("deploy example.com"));

    let report = pending.wait().await.unwrap();
    assert!(report.ok);
    assert!(host.runner.called("systemctl restart dotnet-example.com"));
}

#[tokio::test]
async fn test_submit_without_deadline_finishes() {
    let host = Host::new();
    let submission = host.orchestrator.submit(enable(DOMAIN), None).await;
    assert!(matches!(submission, Submission::Finished(Ok(_))));
}
