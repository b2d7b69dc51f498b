// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The surface on which contract state is rendered.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::info;

use crate::Error;

/// A piece of rendered content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Text(String),
    LineBreak,
    /// A paragraph-like container, e.g. one rendered entry.
    Block { class: String, children: Vec<Node> },
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn block(class: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Block {
            class: class.into(),
            children,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(text) => write!(f, "{text}"),
            Node::LineBreak => writeln!(f),
            Node::Block { children, .. } => {
                for child in children {
                    write!(f, "{child}")?;
                }
                Ok(())
            }
        }
    }
}

/// Elements addressed by identifier, plus a way to alert the user.
///
/// All operations fail with [`Error::UnknownElement`] if the element does not exist.
pub trait DisplaySurface: Send + Sync {
    /// Replaces all the children of `element` with a single text node.
    fn replace_text(&self, element: &str, text: &str) -> Result<(), Error>;

    fn append_child(&self, element: &str, node: Node) -> Result<(), Error>;

    fn prepend_child(&self, element: &str, node: Node) -> Result<(), Error>;

    /// Removes the first child of `element`. Returns `false` if there was none.
    fn remove_first_child(&self, element: &str) -> Result<bool, Error>;

    /// Shows a blocking message to the user.
    fn alert(&self, message: &str);

    /// Removes all the children of `element`.
    fn clear(&self, element: &str) -> Result<(), Error> {
        while self.remove_first_child(element)? {}
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemorySurfaceInner {
    elements: BTreeMap<String, Vec<Node>>,
    alerts: Vec<String>,
}

/// A display surface that keeps its content in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySurface(Arc<Mutex<MemorySurfaceInner>>);

impl MemorySurface {
    /// Creates a surface with the given (empty) elements.
    pub fn with_elements<'a>(elements: impl IntoIterator<Item = &'a str>) -> Self {
        let elements = elements
            .into_iter()
            .map(|id| (id.to_owned(), Vec::new()))
            .collect();
        MemorySurface(Arc::new(Mutex::new(MemorySurfaceInner {
            elements,
            alerts: Vec::new(),
        })))
    }

    /// Returns the children of `element`, or `None` if it does not exist.
    pub fn children(&self, element: &str) -> Option<Vec<Node>> {
        self.lock().elements.get(element).cloned()
    }

    /// Returns the concatenated text content of `element`.
    pub fn text(&self, element: &str) -> Option<String> {
        let inner = self.lock();
        let children = inner.elements.get(element)?;
        Some(children.iter().map(ToString::to_string).collect())
    }

    /// Returns every message passed to [`DisplaySurface::alert`] so far.
    pub fn alerts(&self) -> Vec<String> {
        self.lock().alerts.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemorySurfaceInner> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_element<T>(
        &self,
        element: &str,
        f: impl FnOnce(&mut Vec<Node>) -> T,
    ) -> Result<T, Error> {
        let mut inner = self.lock();
        let children = inner
            .elements
            .get_mut(element)
            .ok_or_else(|| Error::UnknownElement(element.to_owned()))?;
        Ok(f(children))
    }
}

impl DisplaySurface for MemorySurface {
    fn replace_text(&self, element: &str, text: &str) -> Result<(), Error> {
        self.with_element(element, |children| {
            children.clear();
            children.push(Node::text(text));
        })
    }

    fn append_child(&self, element: &str, node: Node) -> Result<(), Error> {
        self.with_element(element, |children| children.push(node))
    }

    fn prepend_child(&self, element: &str, node: Node) -> Result<(), Error> {
        self.with_element(element, |children| children.insert(0, node))
    }

    fn remove_first_child(&self, element: &str) -> Result<bool, Error> {
        self.with_element(element, |children| {
            if children.is_empty() {
                false
            } else {
                children.remove(0);
                true
            }
        })
    }

    fn alert(&self, message: &str) {
        self.lock().alerts.push(message.to_owned());
    }

    fn clear(&self, element: &str) -> Result<(), Error> {
        self.with_element(element, Vec::clear)
    }
}

/// Wraps a surface and reports every change as a log event. Used where there is no
/// screen to look at, e.g. in the command-line runner.
pub struct TracingSurface<S> {
    inner: S,
}

impl<S> TracingSurface<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: DisplaySurface> DisplaySurface for TracingSurface<S> {
    fn replace_text(&self, element: &str, text: &str) -> Result<(), Error> {
        self.inner.replace_text(element, text)?;
        info!(element, "{text}");
        Ok(())
    }

    fn append_child(&self, element: &str, node: Node) -> Result<(), Error> {
        let rendered = node.to_string();
        self.inner.append_child(element, node)?;
        info!(element, "+ {}", rendered.trim_end().replace('\n', " | "));
        Ok(())
    }

    fn prepend_child(&self, element: &str, node: Node) -> Result<(), Error> {
        let rendered = node.to_string();
        self.inner.prepend_child(element, node)?;
        info!(element, "+ {}", rendered.trim_end().replace('\n', " | "));
        Ok(())
    }

    fn remove_first_child(&self, element: &str) -> Result<bool, Error> {
        self.inner.remove_first_child(element)
    }

    fn alert(&self, message: &str) {
        tracing::warn!("{message}");
        self.inner.alert(message);
    }

    fn clear(&self, element: &str) -> Result<(), Error> {
        self.inner.clear(element)
    }
}
