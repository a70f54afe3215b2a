//! Stealth evasion scripts, injected before any page script runs.
//!
//! Based on puppeteer-extra-plugin-stealth techniques. The language, plugin,
//! platform and WebGL fingerprints follow the identity so the page sees the
//! same browser the request headers claim to be.

use crate::scrapers::http_client::{Identity, Platform};

const WEBDRIVER: &str = r#"
Object.defineProperty(navigator, 'webdriver', {
    get: () => undefined,
    configurable: true
});
"#;

const CHROME_RUNTIME: &str = r#"
window.chrome = {
    runtime: {},
    loadTimes: function() {},
    csi: function() {},
    app: {}
};
"#;

const PERMISSIONS: &str = r#"
if (window.navigator.permissions) {
    const originalQuery = window.navigator.permissions.query;
    window.navigator.permissions.query = (parameters) => (
        parameters.name === 'notifications' ?
        Promise.resolve({ state: Notification.permission }) :
        originalQuery(parameters)
    );
}
"#;

const CDC_CLEANUP: &str = r#"
delete window.cdc_adoQpoasnfa76pfcZLmcfl_Array;
delete window.cdc_adoQpoasnfa76pfcZLmcfl_Promise;
delete window.cdc_adoQpoasnfa76pfcZLmcfl_Symbol;
"#;

/// Desktop browsers expose the built-in PDF viewer under these names.
const PDF_PLUGINS: &[&str] = &[
    "PDF Viewer",
    "Chrome PDF Viewer",
    "Chromium PDF Viewer",
    "Microsoft Edge PDF Viewer",
    "WebKit built-in PDF",
];

/// WebGL (vendor, renderer) plausible for a platform.
fn webgl_fingerprint(platform: Platform) -> (&'static str, &'static str) {
    match platform {
        Platform::Windows => (
            "Google Inc. (Intel)",
            "ANGLE (Intel, Intel(R) UHD Graphics 630 Direct3D11 vs_5_0 ps_5_0, D3D11)",
        ),
        Platform::MacOs | Platform::Ios => ("Apple Inc.", "Apple GPU"),
        Platform::Android => ("Qualcomm", "Adreno (TM) 640"),
        Platform::Linux => ("Intel Inc.", "Intel Iris OpenGL Engine"),
    }
}

/// JS string literal for `value`.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Scripts to register with `Page.addScriptToEvaluateOnNewDocument`.
pub fn stealth_scripts(identity: &Identity) -> Vec<String> {
    let profile = &identity.profile;
    let mut scripts = vec![WEBDRIVER.to_string()];

    if profile.family.sends_client_hints() {
        scripts.push(CHROME_RUNTIME.to_string());
    }
    scripts.push(PERMISSIONS.to_string());

    let plugins: Vec<String> = if profile.mobile {
        Vec::new()
    } else {
        PDF_PLUGINS
            .iter()
            .map(|name| {
                format!(
                    "{{ name: {}, filename: 'internal-pdf-viewer', description: 'Portable Document Format' }}",
                    js_string(name)
                )
            })
            .collect()
    };
    scripts.push(format!(
        "Object.defineProperty(navigator, 'plugins', {{ get: () => [{}], configurable: true }});",
        plugins.join(", ")
    ));

    let languages = serde_json::to_string(&identity.languages()).unwrap_or_else(|_| "[]".into());
    scripts.push(format!(
        "Object.defineProperty(navigator, 'languages', {{ get: () => {}, configurable: true }});",
        languages
    ));

    scripts.push(format!(
        "Object.defineProperty(navigator, 'platform', {{ get: () => {}, configurable: true }});",
        js_string(profile.platform.navigator_platform())
    ));

    scripts.push(CDC_CLEANUP.to_string());

    let (vendor, renderer) = webgl_fingerprint(profile.platform);
    scripts.push(format!(
        r#"
if (window.WebGLRenderingContext) {{
    const getParameter = WebGLRenderingContext.prototype.getParameter;
    WebGLRenderingContext.prototype.getParameter = function(parameter) {{
        if (parameter === 37445) return {};
        if (parameter === 37446) return {};
        return getParameter.call(this, parameter);
    }};
}}
"#,
        js_string(vendor),
        js_string(renderer)
    ));

    scripts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::http_client::DEFAULT_USER_AGENTS;

    #[test]
    fn test_languages_follow_identity() {
        let identity = Identity::new(DEFAULT_USER_AGENTS[0], "he-IL,he;q=0.9,en;q=0.5", None);
        let joined = stealth_scripts(&identity).join("\n");
        assert!(joined.contains(r#"["he-IL","he","en"]"#));
        assert!(joined.contains("'webdriver'"));
    }

    #[test]
    fn test_chrome_object_only_for_chromium_identities() {
        let firefox = DEFAULT_USER_AGENTS
            .iter()
            .find(|ua| ua.contains("Firefox/"))
            .unwrap();
        let scripts = stealth_scripts(&Identity::new(firefox, "en-US", None)).join("\n");
        assert!(!scripts.contains("window.chrome ="));

        let chrome = Identity::new(DEFAULT_USER_AGENTS[0], "en-US", None);
        assert!(stealth_scripts(&chrome).join("\n").contains("window.chrome ="));
    }

    #[test]
    fn test_platform_matches_user_agent() {
        let mac = DEFAULT_USER_AGENTS
            .iter()
            .find(|ua| ua.contains("Macintosh"))
            .unwrap();
        let scripts = stealth_scripts(&Identity::new(mac, "en-US", None)).join("\n");
        assert!(scripts.contains("\"MacIntel\""));
        assert!(scripts.contains("\"Apple Inc.\""));
    }

    #[test]
    fn test_mobile_identity_has_no_plugins() {
        let android = DEFAULT_USER_AGENTS
            .iter()
            .find(|ua| ua.contains("Android"))
            .unwrap();
        let scripts = stealth_scripts(&Identity::new(android, "en-US", None)).join("\n");
        assert!(scripts.contains("get: () => []"));
    }
}
