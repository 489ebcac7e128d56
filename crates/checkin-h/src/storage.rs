//! Moving a stored session in and out of a live page.

use checkin_engine::backend::BackendError;
use checkin_engine::session_state::{OriginStorage, SessionCookie, SessionState, StorageItem};
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::network::{
    Cookie, CookieParam, CookieSameSite, SetCookiesParams, TimeSinceEpoch,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use serde::Deserialize;
use std::path::Path;

/// Read and parse a session artifact.
pub async fn read_state(path: &Path) -> Result<SessionState, BackendError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        BackendError::Session(format!("cannot read {}: {}", path.display(), e))
    })?;
    SessionState::from_json(&content).map_err(|e| {
        BackendError::Session(format!("{} is not a valid session: {}", path.display(), e))
    })
}

/// Install cookies and per-origin localStorage before the first navigation.
pub async fn import(page: &Page, state: &SessionState) -> Result<(), BackendError> {
    if !state.cookies.is_empty() {
        let cookies: Vec<CookieParam> = state.cookies.iter().map(cookie_param).collect();
        page.execute(SetCookiesParams::new(cookies))
            .await
            .map_err(|e| BackendError::Session(format!("failed to set cookies: {}", e)))?;
    }

    for origin in &state.origins {
        if origin.local_storage.is_empty() {
            continue;
        }
        let script = local_storage_script(origin)?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(script))
            .await
            .map_err(|e| BackendError::Session(format!("failed to seed localStorage: {}", e)))?;
    }

    tracing::debug!(
        "Imported {} cookies and {} origins",
        state.cookies.len(),
        state.origins.len()
    );
    Ok(())
}

/// Snapshot cookies for the current page and localStorage for its origin.
pub async fn export(page: &Page) -> Result<SessionState, BackendError> {
    let cookies = page
        .get_cookies()
        .await
        .map_err(|e| BackendError::Other(format!("Get cookies failed: {}", e)))?
        .into_iter()
        .map(session_cookie)
        .collect();

    let snapshot: LocalStorageSnapshot = page
        .evaluate("({ origin: location.origin, entries: Object.entries(localStorage) })")
        .await
        .map_err(|e| BackendError::ScriptError(e.to_string()))?
        .into_value()?;

    let mut origins = Vec::new();
    if !snapshot.entries.is_empty() && snapshot.origin != "null" {
        origins.push(OriginStorage {
            origin: snapshot.origin,
            local_storage: snapshot
                .entries
                .into_iter()
                .map(|(name, value)| StorageItem { name, value })
                .collect(),
        });
    }

    Ok(SessionState { cookies, origins })
}

#[derive(Deserialize)]
struct LocalStorageSnapshot {
    origin: String,
    entries: Vec<(String, String)>,
}

fn cookie_param(cookie: &SessionCookie) -> CookieParam {
    let mut param = CookieParam::new(cookie.name.clone(), cookie.value.clone());
    param.domain = Some(cookie.domain.clone()).filter(|d| !d.is_empty());
    param.path = Some(cookie.path.clone());
    param.secure = Some(cookie.secure);
    param.http_only = Some(cookie.http_only);
    param.same_site = cookie.same_site.as_deref().and_then(same_site);
    if cookie.expires > 0.0 {
        param.expires = Some(TimeSinceEpoch::new(cookie.expires));
    }
    param
}

fn session_cookie(cookie: Cookie) -> SessionCookie {
    SessionCookie {
        name: cookie.name,
        value: cookie.value,
        domain: cookie.domain,
        path: cookie.path,
        expires: if cookie.session { -1.0 } else { cookie.expires },
        http_only: cookie.http_only,
        secure: cookie.secure,
        same_site: cookie.same_site.map(|s| {
            match s {
                CookieSameSite::Strict => "Strict",
                CookieSameSite::Lax => "Lax",
                CookieSameSite::None => "None",
            }
            .to_string()
        }),
    }
}

fn same_site(value: &str) -> Option<CookieSameSite> {
    match value.to_ascii_lowercase().as_str() {
        "strict" => Some(CookieSameSite::Strict),
        "lax" => Some(CookieSameSite::Lax),
        "none" => Some(CookieSameSite::None),
        _ => None,
    }
}

fn local_storage_script(origin: &OriginStorage) -> Result<String, BackendError> {
    let entries: Vec<(&str, &str)> = origin
        .local_storage
        .iter()
        .map(|item| (item.name.as_str(), item.value.as_str()))
        .collect();
    Ok(format!(
        "(() => {{ if (location.origin !== {origin}) return; \
         for (const [k, v] of {entries}) {{ \
         try {{ localStorage.setItem(k, v); }} catch (e) {{}} }} }})();",
        origin = serde_json::to_string(&origin.origin)?,
        entries = serde_json::to_string(&entries)?,
    ))
}
