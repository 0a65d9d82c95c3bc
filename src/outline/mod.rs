//! The companion outline document: a flat text of show topics parsed into
//! structured lines and rendered back.
//!
//! A line starting with one of the topic markers is a topic; the subtopic
//! markers make it a subtopic whose depth comes from its leading tabs.
//! Parsing normalizes curly quotes and triple-space indentation, drops
//! blank lines, and re-renders the text in canonical form.

/// Characters that open either a main topic or a subtopic.
pub const START_CHARS: [char; 7] = ['-', '–', '—', '−', '⸺', '∟', '+'];

/// Characters that open a subtopic.
pub const SUBTOPIC_CHARS: [char; 2] = ['∟', '+'];

/// One parsed outline line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineLine {
    is_topic: bool,
    is_subtopic: bool,
    pub title: String,
    /// Depth of a subtopic; always 0 for anything else.
    pub depth: usize,
}

impl OutlineLine {
    /// Parse a trimmed source line at the given indent depth.
    pub fn parse(line: &str, depth: usize) -> Self {
        let first = line.chars().next();
        let is_topic = first.is_some_and(|c| START_CHARS.contains(&c));
        let is_subtopic = first.is_some_and(|c| SUBTOPIC_CHARS.contains(&c));

        let title = if is_topic {
            line.chars().skip(1).collect::<String>().trim().to_string()
        } else {
            line.trim().to_string()
        };

        Self {
            is_topic,
            is_subtopic,
            title,
            depth: if is_subtopic { depth } else { 0 },
        }
    }

    pub fn is_topic(&self) -> bool {
        self.is_topic
    }

    pub fn is_subtopic(&self) -> bool {
        self.is_subtopic
    }

    /// The canonical marker for this line, if it is a topic.
    pub fn topic_char(&self) -> Option<char> {
        if self.is_subtopic {
            Some('∟')
        } else if self.is_topic {
            Some('–')
        } else {
            None
        }
    }

    /// Recombine the line into canonical source form.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for _ in 0..self.depth {
            out.push('\t');
        }
        if let Some(marker) = self.topic_char() {
            out.push(marker);
            out.push(' ');
        }
        out.push_str(&self.title);
        out
    }
}

/// The outline document: raw text plus its parsed lines and the topic the
/// user last worked from.
#[derive(Debug, Default)]
pub struct OutlineDoc {
    text: String,
    lines: Vec<OutlineLine>,
    active_index: usize,
}

impl OutlineDoc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        let mut doc = Self {
            text: text.into(),
            ..Self::default()
        };
        doc.generate_lines();
        doc
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> &[OutlineLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn set_active_index(&mut self, index: usize) {
        if index < self.lines.len() {
            self.active_index = index;
        }
    }

    /// Replace the raw text and reparse.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.generate_lines();
    }

    /// Parse the raw text into lines: normalize curly quotes, turn
    /// triple-space indents into tabs, drop empty lines and bare markers,
    /// then re-render the text in canonical form.
    pub fn generate_lines(&mut self) {
        let normalized = self
            .text
            .replace(['“', '”'], "\"")
            .replace(['‘', '’'], "'")
            .replace("   ", "\t");

        self.lines = normalized
            .lines()
            .filter(|line| {
                let trimmed = line.trim();
                let is_topic = trimmed
                    .chars()
                    .next()
                    .is_some_and(|c| START_CHARS.contains(&c));
                (!trimmed.is_empty() && !is_topic) || (is_topic && trimmed.chars().count() > 1)
            })
            .map(|line| OutlineLine::parse(line.trim(), leading_tab_count(line)))
            .collect();

        if self.active_index >= self.lines.len() {
            self.active_index = 0;
        }
        self.update_text();
    }

    /// Rebuild the raw text from the parsed lines.
    pub fn update_text(&mut self) {
        self.text = self
            .lines
            .iter()
            .map(OutlineLine::render)
            .collect::<Vec<_>>()
            .join("\n");
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.lines.clear();
        self.active_index = 0;
    }
}

/// Number of tabs before the first non-indent character.
fn leading_tab_count(text: &str) -> usize {
    text.chars()
        .take_while(|c| *c == '\t' || *c == ' ')
        .filter(|c| *c == '\t')
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_not_topics() {
        let line = OutlineLine::parse("just some notes", 0);
        assert!(!line.is_topic());
        assert_eq!(line.title, "just some notes");
        assert_eq!(line.render(), "just some notes");
    }

    #[test]
    fn dash_lines_are_topics() {
        let line = OutlineLine::parse("- Opening segment", 0);
        assert!(line.is_topic());
        assert!(!line.is_subtopic());
        assert_eq!(line.title, "Opening segment");
        assert_eq!(line.render(), "– Opening segment");
    }

    #[test]
    fn subtopics_keep_their_depth() {
        let line = OutlineLine::parse("+ Detail point", 2);
        assert!(line.is_subtopic());
        assert_eq!(line.depth, 2);
        assert_eq!(line.render(), "\t\t∟ Detail point");
    }

    #[test]
    fn document_parses_and_canonicalizes() {
        let mut doc = OutlineDoc::from_text("- First\n\n   + Sub one\nnotes\n-\n");
        assert_eq!(doc.lines().len(), 3);
        assert!(doc.lines()[0].is_topic());
        assert!(doc.lines()[1].is_subtopic());
        assert_eq!(doc.lines()[1].depth, 1);
        // bare "-" and the blank line are dropped, text is canonical
        assert_eq!(doc.text(), "– First\n\t∟ Sub one\nnotes");

        doc.clear();
        assert!(doc.is_empty());
        assert_eq!(doc.text(), "");
    }

    #[test]
    fn curly_quotes_are_normalized() {
        let doc = OutlineDoc::from_text("- “Quoted” and ‘single’");
        assert_eq!(doc.lines()[0].title, "\"Quoted\" and 'single'");
    }

    #[test]
    fn active_index_stays_in_bounds() {
        let mut doc = OutlineDoc::from_text("- A\n- B");
        doc.set_active_index(1);
        assert_eq!(doc.active_index(), 1);
        doc.set_active_index(9);
        assert_eq!(doc.active_index(), 1);
        doc.set_text("- A");
        assert_eq!(doc.active_index(), 0);
    }
}
