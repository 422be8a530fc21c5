// The Web UI contract: paths and form fields per firmware.
//
// None of this is documented by the vendor. Defaults match current SPC
// firmware; every field can be overridden from configuration when a panel
// answers differently.

use serde::{Deserialize, Serialize};

use crate::model::PanelCommand;

/// Placeholder substituted with the session id in path templates.
pub const SESSION_PLACEHOLDER: &str = "{session}";

/// One `name=value` pair submitted with a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

impl FormField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Firmware-dependent paths and form layout of the Web UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Login form target.
    pub login_path: String,
    pub username_field: String,
    pub password_field: String,
    /// Page showing the area summary; `{session}` is substituted.
    pub status_path: String,
    /// Form target for arming / disarming; `{session}` is substituted.
    pub command_path: String,
    pub arm_field: FormField,
    pub disarm_field: FormField,
    /// Logout link; `{session}` is substituted.
    pub logout_path: String,
    /// Row label of the area group whose state is read.
    pub area_label: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login_path: "/login.htm?action=login&language=0".into(),
            username_field: "userid".into(),
            password_field: "password".into(),
            status_path: "/secure.htm?session={session}&page=system_summary".into(),
            command_path: "/secure.htm?session={session}&page=system_summary&action=update"
                .into(),
            arm_field: FormField::new("fullset_all", "Fullset"),
            disarm_field: FormField::new("unset_all", "Unset"),
            logout_path: "/secure.htm?session={session}&page=logout".into(),
            area_label: "All Areas".into(),
        }
    }
}

impl Endpoints {
    pub fn status(&self, session_id: &str) -> String {
        with_session(&self.status_path, session_id)
    }

    pub fn command(&self, session_id: &str) -> String {
        with_session(&self.command_path, session_id)
    }

    pub fn logout(&self, session_id: &str) -> String {
        with_session(&self.logout_path, session_id)
    }

    /// Form field that triggers `command`.
    pub fn command_field(&self, command: PanelCommand) -> &FormField {
        match command {
            PanelCommand::Arm => &self.arm_field,
            PanelCommand::Disarm => &self.disarm_field,
        }
    }
}

fn with_session(template: &str, session_id: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(session_id.as_bytes()).collect();
    template.replace(SESSION_PLACEHOLDER, &encoded)
}
