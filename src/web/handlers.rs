use super::form::{parse_preset_id, resolve_request, IndexQuery, RunForm};
use super::pages::{self, FormPage};
use super::AppState;
use crate::error::AnalysisError;
use crate::model::{AnalysisResult, Preset};
use axum::body::Body;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::{Form, Json};
use bytes::Bytes;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path};
use tracing::{error, info, warn};

pub(crate) async fn healthz_handler() -> &'static str {
    "ok"
}

fn dedupe_keys(keys: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty() && seen.insert(k.clone()))
        .collect()
}

pub(crate) async fn index_handler(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
) -> Html<String> {
    let preset_id = parse_preset_id(&query.preset_id);
    let mut page = FormPage {
        preset_id,
        extra_instructions: state.default_extra_instructions.to_string(),
        ..Default::default()
    };

    let dropdowns = async {
        let presets = state.presets.active_presets().await?;
        let keys = state.presets.instruction_presets().await?;
        Ok::<_, crate::error::PresetError>((presets, keys))
    };
    match dropdowns.await {
        Ok((presets, keys)) => {
            info!(presets = presets.len(), instruction_presets = keys.len(), "loaded presets");
            page.presets = presets;
            page.instruction_presets = dedupe_keys(keys);
        }
        Err(e) => {
            error!(error = %e, "failed to load preset dropdowns");
            page.error = Some(format!("Failed to load presets: {e}"));
            return Html(pages::render_index(&page));
        }
    }

    if let Some(id) = preset_id {
        match state.presets.preset(id).await {
            Ok(Some(p)) => {
                page.competitor = p.competitor.trim().to_string();
                page.baseline = p.baseline.trim().to_string();
                page.file = p.source_file_path.trim().to_string();
                page.instruction_preset = p.instruction_preset.trim().to_string();
                if !p.extra_instructions.trim().is_empty() {
                    page.extra_instructions = p.extra_instructions.clone();
                }
            }
            Ok(None) => page.error = Some(format!("Preset id {id} not found or inactive.")),
            Err(e) => {
                error!(error = %e, preset_id = id, "failed to load preset");
                page.error = Some(format!("Failed to load preset {id}: {e}"));
            }
        }
    }

    Html(pages::render_index(&page))
}

async fn selected_preset(state: &AppState, raw_id: &str) -> Option<Preset> {
    let id = parse_preset_id(raw_id)?;
    match state.presets.preset(id).await {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, preset_id = id, "preset lookup failed; running without it");
            None
        }
    }
}

/// Resolve the form, run the generator and remember where its outputs live.
async fn execute_run(state: &AppState, form: &RunForm) -> Result<AnalysisResult, AnalysisError> {
    let preset = selected_preset(state, &form.preset_id).await;
    let request = resolve_request(form, preset.as_ref(), &state.default_extra_instructions);
    let result = state.service.run(&request).await?;
    if let Some(dir) = &result.run_dir {
        state.register_run(result.run_id.clone(), dir.clone());
    }
    Ok(result)
}

fn error_status(e: &AnalysisError) -> StatusCode {
    if e.is_validation() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn result_status(result: &AnalysisResult) -> StatusCode {
    if result.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

pub(crate) async fn run_handler(
    State(state): State<AppState>,
    Form(form): Form<RunForm>,
) -> Response {
    match execute_run(&state, &form).await {
        Ok(result) => (result_status(&result), Html(pages::render_result(&result))).into_response(),
        Err(e) => {
            warn!(error = %e, "run request failed");
            (error_status(&e), Html(pages::render_error(&e.to_string()))).into_response()
        }
    }
}

pub(crate) async fn api_run_handler(
    State(state): State<AppState>,
    Form(form): Form<RunForm>,
) -> Response {
    match execute_run(&state, &form).await {
        Ok(result) => {
            let links: BTreeMap<_, _> = pages::result_links(&result)
                .into_iter()
                .map(|(kind, link)| (kind.extension(), link))
                .collect();
            let status = result_status(&result);
            (status, Json(json!({"result": result, "links": links}))).into_response()
        }
        Err(e) => {
            warn!(error = %e, "api run request failed");
            (error_status(&e), Json(json!({"error": e.to_string()}))).into_response()
        }
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        _ => "application/octet-stream",
    }
}

fn is_inline(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html"))
}

pub(crate) async fn download_handler(
    State(state): State<AppState>,
    UrlPath((run_id, filename)): UrlPath<(String, String)>,
) -> Response {
    let Some(run_dir) = state.run_dir(&run_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let requested = Path::new(&filename);
    if filename.is_empty()
        || requested
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
    {
        warn!(run_id = %run_id, filename = %filename, "rejected download path");
        return StatusCode::FORBIDDEN.into_response();
    }

    let (Ok(root), Ok(full)) = (
        tokio::fs::canonicalize(&run_dir).await,
        tokio::fs::canonicalize(run_dir.join(requested)).await,
    ) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    // Symlinks inside the run directory may still point elsewhere.
    if full == root || !full.starts_with(&root) {
        warn!(run_id = %run_id, filename = %filename, "download escapes run directory");
        return StatusCode::FORBIDDEN.into_response();
    }
    if !tokio::fs::metadata(&full)
        .await
        .is_ok_and(|m| m.is_file())
    {
        return StatusCode::NOT_FOUND.into_response();
    }

    let data = match tokio::fs::read(&full).await {
        Ok(data) => Bytes::from(data),
        Err(e) => {
            error!(error = %e, path = %full.display(), "failed to read report file");
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    let name = full
        .file_name()
        .map(|n| n.to_string_lossy().replace('"', "'"))
        .unwrap_or_default();
    let disposition = if is_inline(&full) {
        format!("inline; filename=\"{name}\"")
    } else {
        format!("attachment; filename=\"{name}\"")
    };
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type_for(&full))),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(data),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_trimmed_and_deduplicated_in_order() {
        let keys = vec![
            "risk".to_string(),
            " executive".to_string(),
            "risk ".to_string(),
            "".to_string(),
        ];
        assert_eq!(dedupe_keys(keys), vec!["risk", "executive"]);
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type_for(Path::new("a.HTML")), "text/html; charset=utf-8");
        assert!(content_type_for(Path::new("a.pptx")).contains("presentationml"));
        assert_eq!(content_type_for(Path::new("a.bin")), "application/octet-stream");
        assert!(is_inline(Path::new("r.html")));
        assert!(!is_inline(Path::new("r.docx")));
    }
}
