#![cfg(unix)]

use comparison_portal::cli::build_state;
use comparison_portal::settings::Settings;
use comparison_portal::web::build_router;
use reqwest::StatusCode;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::net::TcpListener;

const FAKE_GENERATOR: &str = r#"#!/bin/sh
printf '%s\n' "$@" > last_args.txt
mkdir -p comparison_report_fake
printf '<h1>report</h1>' > comparison_report_fake/report.html
printf '# report' > comparison_report_fake/report.md
echo "generated"
"#;

struct Portal {
    base: String,
    bin_dir: PathBuf,
    _tmp: TempDir,
}

const SLOW_GENERATOR: &str = "#!/bin/sh\nexec sleep 10\n";

fn write_generator(dir: &Path, script: &str, mode: u32) -> PathBuf {
    let exe = dir.join("generator.sh");
    std::fs::write(&exe, script).unwrap();
    std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(mode)).unwrap();
    exe
}

async fn start_portal() -> Portal {
    start_portal_with(FAKE_GENERATOR, 0o755, 30).await
}

async fn start_portal_with(script: &str, mode: u32, timeout_seconds: u64) -> Portal {
    let tmp = tempfile::tempdir().unwrap();
    let bin_dir = tmp.path().join("bin");
    std::fs::create_dir_all(&bin_dir).unwrap();
    let exe = write_generator(&bin_dir, script, mode);
    std::fs::write(bin_dir.join("secret.txt"), "do not serve").unwrap();

    let ini = format!(
        "[paths]\nexe_path = {}\nreports_base = {}\n\n[execution]\ntimeout_seconds = {}\n",
        exe.display(),
        tmp.path().join("reports").display(),
        timeout_seconds
    );
    let settings = Settings::from_ini_str(&ini, Path::new("portal.ini")).expect("settings");
    let app = build_router(build_state(&settings).await);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Portal {
        base: format!("http://{addr}"),
        bin_dir,
        _tmp: tmp,
    }
}

fn download_links(html: &str) -> Vec<String> {
    html.split("href=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .filter(|href| href.starts_with("/download/"))
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn run_then_download_reports() {
    let portal = start_portal().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/run", portal.base))
        .form(&[("competitor", "acme"), ("baseline", "")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = resp.text().await.unwrap();
    assert!(html.contains("class=\"ok\""));

    let args = std::fs::read_to_string(portal.bin_dir.join("last_args.txt")).unwrap();
    assert_eq!(args, "--competitor\nhttps://acme.com\n--baseline\n\n");

    let links = download_links(&html);
    assert_eq!(links.len(), 2, "html and markdown links in {html}");
    let html_link = links.iter().find(|l| l.ends_with("report.html")).unwrap();
    let md_link = links.iter().find(|l| l.ends_with("report.md")).unwrap();

    let resp = client
        .get(format!("{}{}", portal.base, html_link))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp.headers()["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.starts_with("inline"));
    assert_eq!(resp.text().await.unwrap(), "<h1>report</h1>");

    let resp = client
        .get(format!("{}{}", portal.base, md_link))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp.headers()["content-disposition"].to_str().unwrap();
    assert!(disposition.starts_with("attachment"));

    let run_prefix = html_link.trim_end_matches("report.html");
    let resp = client
        .get(format!("{}{}..%2Fsecret.txt", portal.base, run_prefix))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = client
        .get(format!("{}{}report.docx", portal.base, run_prefix))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .post(format!("{}/api/run", portal.base))
        .form(&[("competitor", "https://example.org/pricing")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&resp.text().await.unwrap()).unwrap();
    assert_eq!(body["result"]["status"], "ok");
    assert_eq!(body["result"]["competitor"], "https://example.org/pricing");
    assert_eq!(body["result"]["exit_code"], 0);
    assert!(body["links"]["html"]
        .as_str()
        .unwrap()
        .ends_with("/report.html"));
    assert!(body["links"].get("docx").is_none());
}

#[tokio::test]
async fn rejects_bad_requests_without_running() {
    let portal = start_portal().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/healthz", portal.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    let resp = client.get(format!("{}/", portal.base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("action=\"/run\""));

    let resp = client
        .post(format!("{}/run", portal.base))
        .form(&[("competitor", "   "), ("baseline", "rival.com")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(resp.text().await.unwrap().contains("Competitor is required."));

    let resp = client
        .post(format!("{}/api/run", portal.base))
        .form(&[("competitor", "")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_str(&resp.text().await.unwrap()).unwrap();
    assert_eq!(body["error"], "Competitor is required.");

    let resp = client
        .get(format!("{}/download/20260101_000000/report.html", portal.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    assert!(!portal.bin_dir.join("last_args.txt").exists());
}

#[tokio::test]
async fn timed_out_run_is_server_error() {
    let portal = start_portal_with(SLOW_GENERATOR, 0o755, 1).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/run", portal.base))
        .form(&[("competitor", "acme")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let html = resp.text().await.unwrap();
    assert!(html.contains("Execution timed out after 1s."), "{html}");
    assert!(download_links(&html).is_empty());
}

#[tokio::test]
async fn unlaunchable_generator_is_server_error() {
    let portal = start_portal_with(FAKE_GENERATOR, 0o644, 30).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/run", portal.base))
        .form(&[("competitor", "acme")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = serde_json::from_str(&resp.text().await.unwrap()).unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to execute"));
    assert!(!portal.bin_dir.join("last_args.txt").exists());
}
