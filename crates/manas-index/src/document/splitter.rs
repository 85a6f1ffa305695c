use std::collections::VecDeque;

/// Passage sizing, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitterConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    pub text: String,
    pub chunk_index: usize,
}

/// Packs sentences into passages of at most `chunk_size` characters, carrying
/// up to `chunk_overlap` characters of trailing sentences into the next passage.
#[derive(Debug, Clone)]
pub struct PassageSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl PassageSplitter {
    #[must_use]
    pub fn new(config: SplitterConfig) -> Self {
        let chunk_size = config.chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: config.chunk_overlap.min(chunk_size - 1),
        }
    }

    #[must_use]
    pub fn split(&self, text: &str) -> Vec<Passage> {
        let mut segments = Vec::new();
        for sentence in sentences(text) {
            hard_wrap(sentence, self.chunk_size, &mut segments);
        }

        let mut passages = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut window_len = 0usize;

        for (segment, len) in segments {
            if !window.is_empty() && window_len + len > self.chunk_size {
                push_passage(&window, &mut passages);
                while let Some(&(_, front_len)) = window.front() {
                    if window_len <= self.chunk_overlap && window_len + len <= self.chunk_size {
                        break;
                    }
                    window.pop_front();
                    window_len -= front_len;
                }
            }
            window.push_back((segment, len));
            window_len += len;
        }

        if !window.is_empty() {
            push_passage(&window, &mut passages);
        }
        passages
    }
}

fn push_passage(window: &VecDeque<(&str, usize)>, out: &mut Vec<Passage>) {
    let joined: String = window.iter().map(|(s, _)| *s).collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        return;
    }
    out.push(Passage {
        text: trimmed.to_owned(),
        chunk_index: out.len(),
    });
}

/// Split on paragraph breaks and on `.`, `?`, `!` followed by whitespace.
/// Slices keep their trailing whitespace so concatenation restores the input.
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        let Some(&(next_i, next_c)) = chars.peek() else {
            break;
        };
        let boundary = match c {
            '.' | '?' | '!' => next_c.is_whitespace(),
            '\n' => next_c == '\n',
            _ => false,
        };
        if boundary {
            // swallow the whitespace run that follows the boundary
            let mut end = next_i;
            while let Some(&(j, w)) = chars.peek() {
                if !w.is_whitespace() {
                    break;
                }
                end = j + w.len_utf8();
                chars.next();
            }
            out.push(&text[start..end]);
            start = end;
        }
    }

    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

/// Break a sentence longer than `limit` characters into `limit`-sized pieces.
fn hard_wrap<'a>(sentence: &'a str, limit: usize, out: &mut Vec<(&'a str, usize)>) {
    let mut rest = sentence;
    loop {
        let len = rest.chars().count();
        if len <= limit {
            if !rest.is_empty() {
                out.push((rest, len));
            }
            return;
        }
        let cut = rest
            .char_indices()
            .nth(limit)
            .map_or(rest.len(), |(idx, _)| idx);
        out.push((&rest[..cut], limit));
        rest = &rest[cut..];
    }
}
