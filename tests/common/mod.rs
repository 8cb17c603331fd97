//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// 2024-01-01 00:00:00 UTC, a Monday
pub const JAN_1_2024: f64 = 1_704_067_200.0;
pub const DAY: f64 = 86_400.0;

/// Builder for a temp directory holding an export and optional config
pub struct ExportDirBuilder {
    temp_dir: TempDir,
}

impl ExportDirBuilder {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self { temp_dir }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `conversations.json` from builders
    pub fn with_conversations(self, conversations: &[ConversationBuilder]) -> Self {
        let content = export_json(conversations);
        self.with_export(&content)
    }

    /// Write `conversations.json` with raw content
    pub fn with_export(self, content: &str) -> Self {
        fs::write(self.export_path(), content).expect("Failed to write conversations.json");
        self
    }

    /// Write a downloaded export archive `downloads/{file_name}` holding
    /// `conversations.json` next to the `chat.html` the service also ships
    pub fn with_archive(self, file_name: &str, conversations: &[ConversationBuilder]) -> Self {
        let downloads = self.downloads_dir();
        fs::create_dir_all(&downloads).expect("Failed to create downloads dir");
        let file = File::create(downloads.join(file_name)).expect("Failed to create archive");
        let mut writer = ZipWriter::new(file);
        writer
            .start_file("chat.html", SimpleFileOptions::default())
            .expect("Failed to start zip entry");
        writer.write_all(b"<html></html>").expect("Failed to write zip entry");
        writer
            .start_file("conversations.json", SimpleFileOptions::default())
            .expect("Failed to start zip entry");
        writer
            .write_all(export_json(conversations).as_bytes())
            .expect("Failed to write zip entry");
        writer.finish().expect("Failed to finish archive");
        self
    }

    /// Write `config.json` with raw content
    pub fn with_config(self, content: &str) -> Self {
        fs::write(self.config_path(), content).expect("Failed to write config.json");
        self
    }

    pub fn export_path(&self) -> PathBuf {
        self.temp_dir.path().join("conversations.json")
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("config.json")
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.temp_dir.path().join("downloads")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.temp_dir.path().join("out")
    }

    pub fn build(self) -> TempDir {
        self.temp_dir
    }
}

impl Default for ExportDirBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one export record
///
/// Starts with a synthetic root node named `root`; nodes are listed in the
/// mapping in the order they were added.
pub struct ConversationBuilder {
    id: String,
    title: Option<String>,
    create_time: Option<f64>,
    update_time: Option<f64>,
    current_node: Option<String>,
    nodes: Vec<NodeBuilder>,
}

impl ConversationBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: Some(format!("Conversation {}", id)),
            create_time: Some(JAN_1_2024),
            update_time: None,
            current_node: None,
            nodes: vec![NodeBuilder::synthetic("root", None)],
        }
    }

    /// A root followed by alternating user/assistant text messages, one second apart
    pub fn linear(id: &str, texts: &[&str]) -> Self {
        let mut builder = Self::new(id);
        let mut parent = "root".to_string();
        for (i, text) in texts.iter().enumerate() {
            let node_id = format!("m{}", i + 1);
            let role = if i % 2 == 0 { "user" } else { "assistant" };
            let time = builder.create_time.unwrap_or(JAN_1_2024) + (i + 1) as f64;
            builder = builder.node(NodeBuilder::text(&node_id, &parent, role, text).at(time));
            parent = node_id;
        }
        builder
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn no_title(mut self) -> Self {
        self.title = None;
        self
    }

    pub fn create_time(mut self, secs: f64) -> Self {
        self.create_time = Some(secs);
        self
    }

    pub fn no_create_time(mut self) -> Self {
        self.create_time = None;
        self
    }

    pub fn update_time(mut self, secs: f64) -> Self {
        self.update_time = Some(secs);
        self
    }

    pub fn current_node(mut self, id: &str) -> Self {
        self.current_node = Some(id.to_string());
        self
    }

    pub fn node(mut self, node: NodeBuilder) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn to_value(&self) -> Value {
        let mut mapping = serde_json::Map::new();
        for node in &self.nodes {
            let children: Vec<&str> = self
                .nodes
                .iter()
                .filter(|n| n.parent.as_deref() == Some(node.id.as_str()))
                .map(|n| n.id.as_str())
                .collect();
            mapping.insert(node.id.clone(), node.to_value(&children));
        }

        json!({
            "id": self.id,
            "conversation_id": self.id,
            "title": self.title,
            "create_time": self.create_time,
            "update_time": self.update_time,
            "current_node": self.current_node,
            "mapping": mapping,
        })
    }
}

/// Builder for one mapping entry
pub struct NodeBuilder {
    id: String,
    parent: Option<String>,
    message: Option<MessageSpec>,
}

struct MessageSpec {
    role: String,
    author_name: Option<String>,
    content: Value,
    create_time: Option<f64>,
    plugin: Option<String>,
    model_slug: Option<String>,
}

impl NodeBuilder {
    /// A node without a message
    pub fn synthetic(id: &str, parent: Option<&str>) -> Self {
        Self { id: id.to_string(), parent: parent.map(str::to_string), message: None }
    }

    pub fn text(id: &str, parent: &str, role: &str, text: &str) -> Self {
        Self::with_content(id, parent, role, json!({"content_type": "text", "parts": [text]}))
    }

    pub fn code(id: &str, parent: &str, language: &str, code: &str) -> Self {
        Self::with_content(
            id,
            parent,
            "assistant",
            json!({"content_type": "code", "language": language, "text": code}),
        )
    }

    /// A tool message produced by a plugin call
    pub fn plugin_result(id: &str, parent: &str, plugin: &str, text: &str) -> Self {
        let mut node = Self::text(id, parent, "tool", text);
        if let Some(message) = node.message.as_mut() {
            message.author_name = Some(format!("{}.call", plugin));
            message.plugin = Some(plugin.to_string());
        }
        node
    }

    pub fn with_content(id: &str, parent: &str, role: &str, content: Value) -> Self {
        Self {
            id: id.to_string(),
            parent: Some(parent.to_string()),
            message: Some(MessageSpec {
                role: role.to_string(),
                author_name: None,
                content,
                create_time: None,
                plugin: None,
                model_slug: None,
            }),
        }
    }

    pub fn at(mut self, secs: f64) -> Self {
        if let Some(message) = self.message.as_mut() {
            message.create_time = Some(secs);
        }
        self
    }

    pub fn model(mut self, slug: &str) -> Self {
        if let Some(message) = self.message.as_mut() {
            message.model_slug = Some(slug.to_string());
        }
        self
    }

    fn to_value(&self, children: &[&str]) -> Value {
        let message = self.message.as_ref().map(|m| {
            let mut metadata = serde_json::Map::new();
            if let Some(plugin) = &m.plugin {
                metadata.insert(
                    "invoked_plugin".to_string(),
                    json!({"namespace": plugin, "type": "remote"}),
                );
            }
            if let Some(slug) = &m.model_slug {
                metadata.insert("model_slug".to_string(), json!(slug));
            }
            json!({
                "id": self.id,
                "author": {"role": m.role, "name": m.author_name, "metadata": {}},
                "create_time": m.create_time,
                "content": m.content,
                "metadata": metadata,
                "recipient": "all",
            })
        });

        json!({
            "id": self.id,
            "message": message,
            "parent": self.parent,
            "children": children,
        })
    }
}

/// Serialize records as an export document
pub fn export_json(conversations: &[ConversationBuilder]) -> String {
    let records: Vec<Value> = conversations.iter().map(ConversationBuilder::to_value).collect();
    serde_json::to_string_pretty(&records).expect("Failed to serialize export")
}

/// A conversation where the assistant's first reply was regenerated:
/// root -> q -> (a-old | a-new -> follow-up)
pub fn branching_conversation(id: &str) -> ConversationBuilder {
    ConversationBuilder::new(id)
        .title("Branching")
        .node(NodeBuilder::text("q", "root", "user", "Explain ownership").at(JAN_1_2024 + 1.0))
        .node(NodeBuilder::text("a-old", "q", "assistant", "Old explanation").at(JAN_1_2024 + 2.0))
        .node(
            NodeBuilder::text("a-new", "q", "assistant", "New explanation")
                .at(JAN_1_2024 + 3.0)
                .model("gpt-4"),
        )
        .node(NodeBuilder::text("f", "a-new", "user", "Thanks").at(JAN_1_2024 + 4.0))
}

/// A small but varied export: linear chats, a branch, a plugin call, code, and
/// one conversation without a timestamp
pub fn realistic_export() -> Vec<ConversationBuilder> {
    vec![
        ConversationBuilder::linear("c-linear", &["What is Rust?", "A systems language."])
            .title("Rust basics"),
        branching_conversation("c-branch"),
        ConversationBuilder::new("c-plugin")
            .title("Weather in Oslo")
            .create_time(JAN_1_2024 + 8.0 * DAY)
            .node(NodeBuilder::text("q", "root", "user", "Weather in Oslo?"))
            .node(NodeBuilder::plugin_result("t", "q", "weather", "Rain"))
            .node(NodeBuilder::text("a", "t", "assistant", "It is raining.").model("gpt-4-plugins")),
        ConversationBuilder::new("c-code")
            .title("Shell help")
            .create_time(JAN_1_2024 + 40.0 * DAY)
            .node(NodeBuilder::text("q", "root", "user", "List files"))
            .node(NodeBuilder::code("a", "q", "bash", "ls -la")),
        ConversationBuilder::linear("c-undated", &["Hello"]).title("Undated").no_create_time(),
    ]
}
