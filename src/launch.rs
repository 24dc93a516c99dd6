//! Launch options for kiosk-mode browser shortcuts
//!
//! Every shortcut runs a flatpak browser through `flatpak run` with a fixed
//! window geometry and `--kiosk "<url>"`. Some streaming sites reject
//! browsers they do not recognise; URLs containing a configured marker get an
//! explicit `--user-agent` appended.

use serde::{Deserialize, Serialize};

use crate::shortcuts::{Shortcut, ShortcutStore, StoreError};

/// A browser this tool knows how to drive through flatpak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownBrowser {
    pub name: &'static str,
    pub app_id: &'static str,
}

pub const KNOWN_BROWSERS: &[KnownBrowser] = &[
    KnownBrowser {
        name: "Chrome",
        app_id: "com.google.Chrome",
    },
    KnownBrowser {
        name: "Edge",
        app_id: "com.microsoft.Edge",
    },
];

pub fn known_browser(name: &str) -> Option<KnownBrowser> {
    KNOWN_BROWSERS
        .iter()
        .copied()
        .find(|b| b.name.eq_ignore_ascii_case(name))
}

/// A browser resolved against the shortcut store: the executable and working
/// directory come from an existing shortcut the user created for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserDescriptor {
    pub display_name: String,
    pub sandbox_app_id: String,
    pub executable_path: String,
    pub working_directory: String,
}

impl BrowserDescriptor {
    pub fn from_template(display_name: &str, sandbox_app_id: &str, template: &Shortcut) -> Self {
        Self {
            display_name: display_name.to_string(),
            sandbox_app_id: sandbox_app_id.to_string(),
            executable_path: template.executable_path.clone(),
            working_directory: template.working_directory.clone(),
        }
    }

    /// Find the template shortcut for `browser` (first entry whose name
    /// contains the browser name) and clone its launch metadata.
    pub fn resolve(browser: KnownBrowser, store: &ShortcutStore) -> Result<Self, StoreError> {
        let template = store.find_by_name_contains(browser.name)?;
        Ok(Self::from_template(browser.name, browser.app_id, template))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowOptions {
    pub width: u32,
    pub height: u32,
    pub scale: f32,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 640,
            scale: 1.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAgentOverride {
    /// Substring of the target URL that triggers the override
    pub marker: String,
    pub user_agent: String,
}

impl UserAgentOverride {
    pub const EDGE_WINDOWS: &'static str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
         AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";

    pub fn defaults() -> Vec<Self> {
        vec![Self {
            marker: "xbox.com".to_string(),
            user_agent: Self::EDGE_WINDOWS.to_string(),
        }]
    }
}

/// Build the `LaunchOptions` string for one kiosk shortcut.
///
/// `browser_command` defaults to the template's executable, verbatim. Only the
/// URL is quoted; everything else is passed through as given.
pub fn build_launch_arguments(
    template: &Shortcut,
    browser_command: Option<&str>,
    sandbox_app_id: &str,
    url: &str,
    window: &WindowOptions,
    overrides: &[UserAgentOverride],
) -> String {
    let command = browser_command.unwrap_or(template.executable_path.as_str());
    let mut args = format!(
        "run --branch=stable --arch=x86_64 --command={command} --file-forwarding {sandbox_app_id} @@u @@ \
         --window-size={},{} --force-device-scale-factor={scale} --device-scale-factor={scale} \
         --kiosk {}",
        window.width,
        window.height,
        quote_url(url),
        scale = window.scale,
    );

    if let Some(ov) = overrides.iter().find(|ov| url.contains(&ov.marker)) {
        args.push_str(&format!(" --user-agent=\"{}\"", ov.user_agent));
    }

    args
}

fn quote_url(url: &str) -> String {
    format!("\"{}\"", url.replace('"', "\\\""))
}

/// Everything needed to turn `(title, url)` into a new shortcut
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchProfile {
    pub browser: BrowserDescriptor,
    pub browser_command: Option<String>,
    pub window: WindowOptions,
    pub user_agent_overrides: Vec<UserAgentOverride>,
    /// Steam collection tag put on every new shortcut
    pub collection: String,
}

impl LaunchProfile {
    pub fn launch_arguments(&self, url: &str) -> String {
        let template = Shortcut::new(
            &self.browser.display_name,
            &self.browser.executable_path,
            &self.browser.working_directory,
            "",
        );
        build_launch_arguments(
            &template,
            self.browser_command.as_deref(),
            &self.browser.sandbox_app_id,
            url,
            &self.window,
            &self.user_agent_overrides,
        )
    }

    /// A new, unkeyed shortcut for `url`.
    pub fn shortcut_for(&self, title: &str, url: &str) -> Shortcut {
        let shortcut = Shortcut::new(
            title,
            &self.browser.executable_path,
            &self.browser.working_directory,
            &self.launch_arguments(url),
        );
        if self.collection.is_empty() {
            shortcut
        } else {
            shortcut.with_tags([self.collection.as_str()])
        }
    }
}
