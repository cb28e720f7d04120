// ── Reverse-proxy configurator ──
//
// Renders one virtual-host fragment per domain from its `SiteRecord` and
// applies it by atomic replace plus a web-server reload. The fragment is a
// pure projection of the record: it is regenerated in full on every
// change and never patched.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::atomic::{read_optional, write_atomic};
use crate::config::ProxySettings;
use crate::error::CoreError;
use crate::exec::CommandRunner;
use crate::model::{Domain, HubPath, Mode, SiteRecord};
use crate::report::Transcript;

const LOOPBACK: &str = "127.0.0.1";
const HUB_READ_TIMEOUT: &str = "3600s";

/// Rendered proxy configuration of a single domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigFragment {
    pub domain: Domain,
    pub text: String,
}

const FORWARDING_HEADERS: [&str; 4] = [
    "        proxy_set_header Host $host;",
    "        proxy_set_header X-Real-IP $remote_addr;",
    "        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;",
    "        proxy_set_header X-Forwarded-Proto $scheme;",
];

/// Render the fragment for `site`.
///
/// Deterministic: an unchanged record always renders byte-identical text.
pub fn render(site: &SiteRecord, settings: &ProxySettings) -> ConfigFragment {
    let domain = site.domain.as_str();
    let mut lines = vec![
        "# Managed by cyberpanel-dotnet; regenerated on every change.".to_owned(),
        format!("# domain={domain} mode={}", site.mode),
        "server {".to_owned(),
        format!("    listen {};", settings.listen_port),
        format!("    server_name {domain} www.{domain};"),
    ];

    match (site.mode, site.listen_port) {
        (Mode::Php, _) => lines.extend(php_locations(domain, settings)),
        (Mode::Dotnet, Some(port)) => lines.extend(dotnet_locations(port, site.active_hubs())),
        (Mode::Dotnet, None) => lines.extend([
            String::new(),
            "    # no listen port assigned".to_owned(),
            "    return 503;".to_owned(),
        ]),
    }
    lines.push("}".to_owned());

    let mut text = lines.join("\n");
    text.push('\n');
    ConfigFragment {
        domain: site.domain.clone(),
        text,
    }
}

fn php_locations(domain: &str, settings: &ProxySettings) -> Vec<String> {
    vec![
        format!("    root {};", settings.docroot_for(domain)),
        "    index index.php index.html;".to_owned(),
        String::new(),
        "    location / {".to_owned(),
        "        try_files $uri $uri/ /index.php?$args;".to_owned(),
        "    }".to_owned(),
        String::new(),
        "    location ~ \\.php$ {".to_owned(),
        "        include fastcgi_params;".to_owned(),
        format!("        fastcgi_pass {};", settings.php_fastcgi),
        "        fastcgi_param SCRIPT_FILENAME $document_root$fastcgi_script_name;".to_owned(),
        "    }".to_owned(),
    ]
}

fn dotnet_locations(port: u16, hubs: &[HubPath]) -> Vec<String> {
    let upstream = format!("http://{LOOPBACK}:{port}");

    let mut lines = vec![
        String::new(),
        "    location / {".to_owned(),
        format!("        proxy_pass {upstream};"),
        "        proxy_http_version 1.1;".to_owned(),
    ];
    lines.extend(FORWARDING_HEADERS.map(str::to_owned));
    lines.push("    }".to_owned());

    // Only listed hubs get upgrade handling; anything else falls through
    // to the generic location above.
    for hub in hubs {
        lines.extend([
            String::new(),
            format!("    location {hub} {{"),
            format!("        proxy_pass {upstream};"),
            "        proxy_http_version 1.1;".to_owned(),
            "        proxy_set_header Upgrade $http_upgrade;".to_owned(),
            "        proxy_set_header Connection \"upgrade\";".to_owned(),
        ]);
        lines.extend(FORWARDING_HEADERS.map(str::to_owned));
        lines.extend([
            "        proxy_buffering off;".to_owned(),
            "        proxy_cache off;".to_owned(),
            format!("        proxy_read_timeout {HUB_READ_TIMEOUT};"),
            format!("        proxy_send_timeout {HUB_READ_TIMEOUT};"),
            "    }".to_owned(),
        ]);
    }
    lines
}

// ── Applying fragments ──────────────────────────────────────────────

/// Writes fragments into the web server's include directory and reloads it.
///
/// All writes and reloads are serialized process-wide: the include
/// directory is one shared resource even though domains are independent.
pub struct ProxyConfigurator {
    settings: ProxySettings,
    runner: Arc<dyn CommandRunner>,
    write_lock: Mutex<()>,
}

impl ProxyConfigurator {
    pub fn new(settings: ProxySettings, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            settings,
            runner,
            write_lock: Mutex::new(()),
        }
    }

    pub fn fragment_path(&self, domain: &Domain) -> PathBuf {
        self.settings.vhost_dir.join(format!("{domain}.conf"))
    }

    /// Regenerate the fragment for `site`, replace it on disk and reload.
    pub async fn apply(
        &self,
        site: &SiteRecord,
        transcript: &mut Transcript,
    ) -> Result<ConfigFragment, CoreError> {
        let fragment = render(site, &self.settings);
        let path = self.fragment_path(&site.domain);

        let _guard = self.write_lock.lock().await;
        if read_optional(&path)?.as_deref() == Some(fragment.text.as_str()) {
            debug!(domain = %site.domain, "proxy fragment unchanged");
        } else {
            write_atomic(&path, fragment.text.as_bytes())?;
            info!(
                domain = %site.domain,
                mode = %site.mode,
                path = %path.display(),
                "wrote proxy fragment"
            );
        }
        transcript.note(format!("proxy fragment {} ({} mode)", path.display(), site.mode));

        self.reload_locked(transcript).await?;
        Ok(fragment)
    }

    /// Remove the fragment of `domain` (used when undoing a brand-new site).
    pub async fn remove(
        &self,
        domain: &Domain,
        transcript: &mut Transcript,
    ) -> Result<(), CoreError> {
        let path = self.fragment_path(domain);
        let _guard = self.write_lock.lock().await;
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(CoreError::storage(&path)(e)),
        }
        self.reload_locked(transcript).await
    }

    async fn reload_locked(&self, transcript: &mut Transcript) -> Result<(), CoreError> {
        let Some((program, args)) = self.settings.reload_command.split_first() else {
            return Err(CoreError::Internal("web server reload command is empty".into()));
        };

        let output = self.runner.run(program, args).await?;
        transcript.record(program, args, &output);
        if !output.success() {
            return Err(CoreError::Service {
                unit: "web server".into(),
                action: "reload".into(),
                code: output.code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        debug!("web server reloaded");
        Ok(())
    }
}
