//! Inbound interaction events and platform-agnostic responses.
//!
//! The platform delivers three interaction shapes:
//! - command invocations (`/dnd character show`)
//! - component activations (button press, select menu)
//! - form (modal) submissions
//!
//! Handlers answer with a [`HandlerResult`], optionally carrying a
//! [`Response`] the pipeline sends through the responder.

use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A command invocation with its subcommand path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandInvocation {
    /// Top-level command name (e.g. `dnd`).
    pub name: String,
    /// Subcommand group/subcommand names in order (e.g. `["character", "show"]`).
    #[serde(default)]
    pub path: Vec<String>,
    /// Option values supplied by the user.
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

impl CommandInvocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: Vec::new(),
            options: HashMap::new(),
        }
    }

    /// Set the subcommand path from a space separated string.
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = path.split_whitespace().map(str::to_string).collect();
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(name.into(), value);
        self
    }

    /// Get a string option.
    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.options.get(name).and_then(|v| v.as_str())
    }

    /// Full command path: name followed by subcommands, space separated.
    pub fn full_path(&self) -> String {
        std::iter::once(self.name.as_str())
            .chain(self.path.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// The shape of an inbound interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionKind {
    /// Slash command invocation.
    Command(CommandInvocation),
    /// Button or select menu activation.
    Component {
        custom_id: String,
        #[serde(default)]
        values: Vec<String>,
    },
    /// Form submission.
    Modal {
        custom_id: String,
        #[serde(default)]
        fields: HashMap<String, String>,
    },
}

/// An inbound interaction event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// Platform interaction id.
    pub id: String,
    /// Requesting user.
    pub user_id: String,
    /// Scope the interaction happened in (guild or channel).
    pub scope_id: String,
    /// Event shape.
    pub kind: InteractionKind,
}

impl Interaction {
    pub fn command(user_id: impl Into<String>, scope_id: impl Into<String>, cmd: CommandInvocation) -> Self {
        Self::new(user_id, scope_id, InteractionKind::Command(cmd))
    }

    pub fn component(
        user_id: impl Into<String>,
        scope_id: impl Into<String>,
        custom_id: impl Into<String>,
        values: Vec<String>,
    ) -> Self {
        Self::new(
            user_id,
            scope_id,
            InteractionKind::Component {
                custom_id: custom_id.into(),
                values,
            },
        )
    }

    pub fn modal(
        user_id: impl Into<String>,
        scope_id: impl Into<String>,
        custom_id: impl Into<String>,
        fields: HashMap<String, String>,
    ) -> Self {
        Self::new(
            user_id,
            scope_id,
            InteractionKind::Modal {
                custom_id: custom_id.into(),
                fields,
            },
        )
    }

    fn new(user_id: impl Into<String>, scope_id: impl Into<String>, kind: InteractionKind) -> Self {
        let user_id = user_id.into();
        Self {
            id: String::new(),
            user_id,
            scope_id: scope_id.into(),
            kind,
        }
    }

    /// Set the platform interaction id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Custom id of a component or modal event.
    pub fn custom_id(&self) -> Option<&str> {
        match &self.kind {
            InteractionKind::Component { custom_id, .. } | InteractionKind::Modal { custom_id, .. } => {
                Some(custom_id)
            }
            InteractionKind::Command(_) => None,
        }
    }

    pub fn is_command(&self) -> bool {
        matches!(self.kind, InteractionKind::Command(_))
    }

    /// Short description used in logs: command path or custom id.
    pub fn route_label(&self) -> String {
        match &self.kind {
            InteractionKind::Command(cmd) => format!("/{}", cmd.full_path()),
            InteractionKind::Component { custom_id, .. } => format!("component {custom_id}"),
            InteractionKind::Modal { custom_id, .. } => format!("modal {custom_id}"),
        }
    }
}

/// Kind of interactive element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Button,
    Select,
    TextInput,
}

/// A button, select menu or text input attached to a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveElement {
    pub kind: ElementKind,
    /// Encoded routing key.
    pub custom_id: String,
    pub label: String,
    /// Select options as `(value, label)` pairs.
    #[serde(default)]
    pub options: Vec<(String, String)>,
    #[serde(default)]
    pub min_values: u32,
    #[serde(default)]
    pub max_values: u32,
}

impl InteractiveElement {
    pub fn button(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Button,
            custom_id: custom_id.into(),
            label: label.into(),
            options: Vec::new(),
            min_values: 0,
            max_values: 0,
        }
    }

    pub fn select(
        custom_id: impl Into<String>,
        label: impl Into<String>,
        options: Vec<(String, String)>,
        min_values: u32,
        max_values: u32,
    ) -> Self {
        Self {
            kind: ElementKind::Select,
            custom_id: custom_id.into(),
            label: label.into(),
            options,
            min_values,
            max_values,
        }
    }

    /// A free-text input, submitted through a form.
    pub fn text_input(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::TextInput,
            custom_id: custom_id.into(),
            label: label.into(),
            options: Vec::new(),
            min_values: 1,
            max_values: 1,
        }
    }
}

/// A file attached to a response.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub data: Bytes,
}

/// Platform-agnostic response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub text: String,
    /// Embeds or other rich payloads, built by the caller.
    pub rich_content: Vec<serde_json::Value>,
    pub interactive_elements: Vec<InteractiveElement>,
    /// Visible only to the requester.
    pub ephemeral: bool,
    /// Replace the message the component lives on instead of posting a new one.
    pub update_in_place: bool,
    pub attachments: Vec<Attachment>,
}

impl Response {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// An ephemeral text response.
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ephemeral: true,
            ..Default::default()
        }
    }

    pub fn with_element(mut self, element: InteractiveElement) -> Self {
        self.interactive_elements.push(element);
        self
    }

    pub fn with_rich_content(mut self, content: serde_json::Value) -> Self {
        self.rich_content.push(content);
        self
    }

    pub fn with_attachment(mut self, filename: impl Into<String>, data: Bytes) -> Self {
        self.attachments.push(Attachment {
            filename: filename.into(),
            data,
        });
        self
    }

    pub fn in_place(mut self) -> Self {
        self.update_in_place = true;
        self
    }

    pub fn as_ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }
}

/// Outcome of a handler invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerResult {
    /// Response for the pipeline to send, if any.
    pub response: Option<Response>,
    /// The handler already answered through the responder itself.
    pub already_acknowledged: bool,
    /// Veto further pipeline handlers for this event.
    pub stop_dispatch: bool,
    /// Free-form values for outer layers (logging, tests).
    pub side_channel: HashMap<String, serde_json::Value>,
}

impl HandlerResult {
    /// A result carrying a response.
    pub fn respond(response: Response) -> Self {
        Self {
            response: Some(response),
            ..Default::default()
        }
    }

    /// A result with no response, for handlers that answered themselves.
    pub fn acknowledged() -> Self {
        Self {
            already_acknowledged: true,
            ..Default::default()
        }
    }

    pub fn stop(mut self) -> Self {
        self.stop_dispatch = true;
        self
    }

    pub fn with_side_channel(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.side_channel.insert(key.into(), value);
        self
    }
}
