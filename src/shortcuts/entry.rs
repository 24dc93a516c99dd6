use std::collections::HashSet;

use super::vdf::{VdfNode, VdfValue};

/// One non-Steam shortcut as Steam lays it out in `shortcuts.vdf`
#[derive(Debug, Clone, PartialEq)]
pub struct Shortcut {
    /// Position key inside the `shortcuts` map, assigned by the store
    pub key: u32,
    pub app_id: Option<u32>,
    pub display_name: String,
    pub executable_path: String,
    pub working_directory: String,
    pub icon: String,
    pub shortcut_path: String,
    pub launch_arguments: String,
    pub is_hidden: u32,
    pub allow_desktop_config: u32,
    pub allow_overlay: u32,
    pub open_vr: u32,
    pub devkit: u32,
    pub devkit_game_id: String,
    pub devkit_override_app_id: Option<u32>,
    pub last_play_time: u32,
    pub flatpak_app_id: Option<String>,
    /// Order matters: tags are written as "0", "1", ... in this order
    pub tags: Vec<String>,
    /// Fields this tool does not model, kept in their original order
    pub extra: Vec<VdfNode>,
}

impl Shortcut {
    pub fn new(
        display_name: &str,
        executable_path: &str,
        working_directory: &str,
        launch_arguments: &str,
    ) -> Self {
        Self {
            key: 0,
            app_id: None,
            display_name: display_name.to_string(),
            executable_path: executable_path.to_string(),
            working_directory: working_directory.to_string(),
            icon: String::new(),
            shortcut_path: String::new(),
            launch_arguments: launch_arguments.to_string(),
            is_hidden: 0,
            allow_desktop_config: 1,
            allow_overlay: 1,
            open_vr: 0,
            devkit: 0,
            devkit_game_id: String::new(),
            devkit_override_app_id: None,
            last_play_time: 0,
            flatpak_app_id: None,
            tags: Vec::new(),
            extra: Vec::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Build a shortcut from the children of one numbered map.
    ///
    /// Field names are matched case-insensitively; anything unrecognized or
    /// of an unexpected type lands in `extra`. When a field appears under two
    /// spellings (`appname` and `AppName`) the first one is used and the
    /// later one goes to `extra`.
    pub(crate) fn from_fields(key: u32, fields: &[VdfNode]) -> Self {
        let mut shortcut = Shortcut::new("", "", "", "");
        shortcut.key = key;
        let mut claimed = HashSet::new();

        for field in fields {
            let name = field.key.to_lowercase();
            if claimed.contains(&name) {
                shortcut.extra.push(field.clone());
                continue;
            }

            let handled = match (name.as_str(), &field.value) {
                ("appid", value) => assign_u32(&mut shortcut.app_id, value),
                ("appname", VdfValue::String(s)) => set(&mut shortcut.display_name, s),
                ("exe", VdfValue::String(s)) => set(&mut shortcut.executable_path, s),
                ("startdir", VdfValue::String(s)) => set(&mut shortcut.working_directory, s),
                ("icon", VdfValue::String(s)) => set(&mut shortcut.icon, s),
                ("shortcutpath", VdfValue::String(s)) => set(&mut shortcut.shortcut_path, s),
                ("launchoptions", VdfValue::String(s)) => {
                    set(&mut shortcut.launch_arguments, s)
                }
                ("ishidden", VdfValue::Int32(v)) => set_u32(&mut shortcut.is_hidden, *v),
                ("allowdesktopconfig", VdfValue::Int32(v)) => {
                    set_u32(&mut shortcut.allow_desktop_config, *v)
                }
                ("allowoverlay", VdfValue::Int32(v)) => set_u32(&mut shortcut.allow_overlay, *v),
                ("openvr", VdfValue::Int32(v)) => set_u32(&mut shortcut.open_vr, *v),
                ("devkit", VdfValue::Int32(v)) => set_u32(&mut shortcut.devkit, *v),
                ("devkitgameid", VdfValue::String(s)) => set(&mut shortcut.devkit_game_id, s),
                ("devkitoverrideappid", value) => {
                    assign_u32(&mut shortcut.devkit_override_app_id, value)
                }
                ("lastplaytime", VdfValue::Int32(v)) => set_u32(&mut shortcut.last_play_time, *v),
                ("flatpakappid", VdfValue::String(s)) => {
                    shortcut.flatpak_app_id = Some(s.clone());
                    true
                }
                ("tags", VdfValue::Map(children)) => {
                    shortcut.tags = tags_from_map(children);
                    true
                }
                _ => false,
            };

            if handled {
                claimed.insert(name);
            } else {
                shortcut.extra.push(field.clone());
            }
        }

        shortcut
    }

    /// Lay the shortcut out as the numbered map Steam expects.
    pub(crate) fn to_node(&self) -> VdfNode {
        let mut fields = Vec::with_capacity(18 + self.extra.len());

        if let Some(app_id) = self.app_id {
            fields.push(VdfNode::int("appid", app_id));
        }
        fields.push(VdfNode::string("AppName", &self.display_name));
        fields.push(VdfNode::string("Exe", &self.executable_path));
        fields.push(VdfNode::string("StartDir", &self.working_directory));
        fields.push(VdfNode::string("icon", &self.icon));
        fields.push(VdfNode::string("ShortcutPath", &self.shortcut_path));
        fields.push(VdfNode::string("LaunchOptions", &self.launch_arguments));
        fields.push(VdfNode::int("IsHidden", self.is_hidden));
        fields.push(VdfNode::int("AllowDesktopConfig", self.allow_desktop_config));
        fields.push(VdfNode::int("AllowOverlay", self.allow_overlay));
        fields.push(VdfNode::int("OpenVR", self.open_vr));
        fields.push(VdfNode::int("Devkit", self.devkit));
        fields.push(VdfNode::string("DevkitGameID", &self.devkit_game_id));
        if let Some(override_id) = self.devkit_override_app_id {
            fields.push(VdfNode::int("DevkitOverrideAppID", override_id));
        }
        fields.push(VdfNode::int("LastPlayTime", self.last_play_time));
        if let Some(flatpak_app_id) = &self.flatpak_app_id {
            fields.push(VdfNode::string("FlatpakAppID", flatpak_app_id));
        }
        fields.extend(self.extra.iter().cloned());
        fields.push(VdfNode::map("tags", tags_to_map(&self.tags)));

        VdfNode::map(self.key.to_string(), fields)
    }

    /// Text fields must survive the NUL-terminated encoding.
    pub(crate) fn text_fields(&self) -> [(&'static str, &str); 7] {
        [
            ("AppName", self.display_name.as_str()),
            ("Exe", self.executable_path.as_str()),
            ("StartDir", self.working_directory.as_str()),
            ("icon", self.icon.as_str()),
            ("ShortcutPath", self.shortcut_path.as_str()),
            ("LaunchOptions", self.launch_arguments.as_str()),
            ("DevkitGameID", self.devkit_game_id.as_str()),
        ]
    }
}

fn set(target: &mut String, value: &str) -> bool {
    *target = value.to_string();
    true
}

fn set_u32(target: &mut u32, value: u32) -> bool {
    *target = value;
    true
}

fn assign_u32(target: &mut Option<u32>, value: &VdfValue) -> bool {
    match value {
        VdfValue::Int32(v) => {
            *target = Some(*v);
            true
        }
        _ => false,
    }
}

/// The format has no list type; lists are maps keyed "0", "1", ...
fn tags_to_map(tags: &[String]) -> Vec<VdfNode> {
    tags.iter()
        .enumerate()
        .map(|(i, tag)| VdfNode::string(i.to_string(), tag))
        .collect()
}

fn tags_from_map(children: &[VdfNode]) -> Vec<String> {
    let mut indexed: Vec<(u64, &str)> = children
        .iter()
        .filter_map(|node| {
            let index = node.key.parse::<u64>().ok()?;
            let value = node.value.as_str()?;
            Some((index, value))
        })
        .collect();
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, tag)| tag.to_string()).collect()
}
