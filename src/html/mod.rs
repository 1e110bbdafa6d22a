//! Narrow document-query layer over `scraper`
//!
//! Removals and replacements edit the parsed tree directly, so queries and
//! serialization only ever see live nodes.

use scraper::node::Text;
use scraper::{ElementRef, Html, Node, Selector};

/// A parsed HTML document
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses a full HTML document
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// Detaches every element matching `css` along with its subtree
    ///
    /// Returns how many elements were matched. An invalid selector matches
    /// nothing.
    pub fn remove(&mut self, css: &str) -> usize {
        let Some(selector) = parse_selector(css) else {
            return 0;
        };
        let ids: Vec<_> = self.select_with(&selector).iter().map(|el| el.id()).collect();
        for id in &ids {
            if let Some(mut node) = self.html.tree.get_mut(*id) {
                node.detach();
            }
        }
        ids.len()
    }

    /// Replaces every element matching `css` with a text node
    pub fn replace_with_text(&mut self, css: &str, text: &str) -> usize {
        let Some(selector) = parse_selector(css) else {
            return 0;
        };
        let ids: Vec<_> = self.select_with(&selector).iter().map(|el| el.id()).collect();
        for id in &ids {
            if let Some(mut node) = self.html.tree.get_mut(*id) {
                node.insert_before(Node::Text(Text { text: text.into() }));
                node.detach();
            }
        }
        ids.len()
    }

    /// All elements matching `css`, in document order
    pub fn select(&self, css: &str) -> Vec<ElementRef<'_>> {
        match parse_selector(css) {
            Some(selector) => self.select_with(&selector),
            None => Vec::new(),
        }
    }

    /// Descendants of `element` matching `css`
    pub fn select_within<'a>(&'a self, element: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
        match parse_selector(css) {
            Some(selector) => element.select(&selector).collect(),
            None => Vec::new(),
        }
    }

    /// Concatenated text of every element matching `css`
    pub fn text(&self, css: &str) -> String {
        self.select(css)
            .into_iter()
            .map(|el| self.element_text(el))
            .collect()
    }

    /// Text content of one element
    pub fn element_text(&self, element: ElementRef<'_>) -> String {
        element.text().collect()
    }

    /// Attribute `name` of the first element matching `css`
    pub fn attr(&self, css: &str, name: &str) -> Option<String> {
        self.select(css)
            .into_iter()
            .next()
            .and_then(|el| el.value().attr(name).map(str::to_string))
    }

    /// True when any element matching `css` carries `class`
    pub fn has_class(&self, css: &str, class: &str) -> bool {
        self.select(css)
            .into_iter()
            .any(|el| el.value().classes().any(|c| c == class))
    }

    /// Serializes the current tree
    pub fn to_html(&self) -> String {
        self.html.html()
    }

    // Walks down from the root element; detached nodes stay in the arena
    // and would otherwise still match.
    fn select_with(&self, selector: &Selector) -> Vec<ElementRef<'_>> {
        self.html.root_element().select(selector).collect()
    }
}

/// Removes markup that never carries listing data
pub fn strip_noise(document: &mut Document) {
    document.remove("style");
    document.remove("script");
}

fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::debug!("Invalid selector '{}': {:?}", css, e);
            None
        }
    }
}
