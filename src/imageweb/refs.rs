//! Reference image rows of the generation form.

use tracing::debug;

use super::files::{PreviewUrls, SelectedFile};

pub const MAX_REFS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum RefSlot {
    Empty,
    /// A file was picked and its data URL is still being read.
    Pending {
        file: SelectedFile,
        preview: String,
        seq: u64,
    },
    /// The data URL is known. `preview` is set when it came from a picked file rather than a
    /// restored draft.
    Loaded {
        data_url: String,
        preview: Option<String>,
    },
}

impl RefSlot {
    fn preview(&self) -> Option<&str> {
        match self {
            RefSlot::Empty => None,
            RefSlot::Pending { preview, .. } => Some(preview),
            RefSlot::Loaded { preview, data_url } => Some(preview.as_deref().unwrap_or(data_url)),
        }
    }

    fn blob_url(&self) -> Option<&str> {
        match self {
            RefSlot::Pending { preview, .. } => Some(preview),
            RefSlot::Loaded {
                preview: Some(preview),
                ..
            } => Some(preview),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefRow {
    pub id: RowId,
    pub slot: RefSlot,
}

/// A file read the caller has to perform and hand back through
/// [`ReferenceList::complete_read`].
#[derive(Debug, Clone)]
pub struct PendingRead {
    pub row: RowId,
    pub seq: u64,
    pub file: SelectedFile,
}

/// Where a reference for a generation request comes from.
#[derive(Debug, Clone)]
pub enum RefSource {
    Ready(String),
    Read(SelectedFile),
}

/// The reference rows in display order. Never empty; at most [`MAX_REFS`] rows.
#[derive(Debug)]
pub struct ReferenceList {
    rows: Vec<RefRow>,
    next_id: u64,
    next_seq: u64,
    previews: PreviewUrls,
}

impl Default for ReferenceList {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceList {
    pub fn new() -> Self {
        let mut list = Self {
            rows: Vec::new(),
            next_id: 0,
            next_seq: 0,
            previews: PreviewUrls::new(),
        };
        list.push_empty();
        list
    }

    fn push_empty(&mut self) -> RowId {
        self.next_id += 1;
        let id = RowId(self.next_id);
        self.rows.push(RefRow {
            id,
            slot: RefSlot::Empty,
        });
        id
    }

    pub fn rows(&self) -> &[RefRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn previews(&self) -> &PreviewUrls {
        &self.previews
    }

    pub fn slot(&self, row: RowId) -> Option<&RefSlot> {
        self.rows.iter().find(|r| r.id == row).map(|r| &r.slot)
    }

    /// Appends an empty row. Does nothing once the list is full.
    pub fn add_row(&mut self) -> Option<RowId> {
        if self.rows.len() >= MAX_REFS {
            return None;
        }
        Some(self.push_empty())
    }

    fn release(previews: &mut PreviewUrls, slot: &RefSlot) {
        if let Some(url) = slot.blob_url() {
            previews.revoke(url);
        }
    }

    /// Puts a picked file into a row. A missing or non-image file clears the row instead.
    /// Returns the read to perform when the file is accepted.
    pub fn select_file(&mut self, row: RowId, file: Option<SelectedFile>) -> Option<PendingRead> {
        let entry = self.rows.iter_mut().find(|r| r.id == row)?;
        Self::release(&mut self.previews, &entry.slot);
        let file = match file.filter(SelectedFile::is_image) {
            Some(file) => file,
            None => {
                entry.slot = RefSlot::Empty;
                return None;
            }
        };
        self.next_seq += 1;
        let seq = self.next_seq;
        let preview = self.previews.create(&file);
        entry.slot = RefSlot::Pending {
            file: file.clone(),
            preview,
            seq,
        };
        Some(PendingRead { row, seq, file })
    }

    /// Stores a finished read. Ignored when the row was removed or got another file meanwhile.
    pub fn complete_read(&mut self, row: RowId, seq: u64, data_url: String) -> bool {
        let Some(entry) = self.rows.iter_mut().find(|r| r.id == row) else {
            debug!("Read finished for removed row {:?}", row);
            return false;
        };
        match &entry.slot {
            RefSlot::Pending {
                preview,
                seq: current,
                ..
            } if *current == seq => {
                entry.slot = RefSlot::Loaded {
                    data_url,
                    preview: Some(preview.clone()),
                };
                true
            }
            _ => {
                debug!("Stale read for row {:?} dropped", row);
                false
            }
        }
    }

    /// Clears a row whose read failed. Ignored when the row moved on to another file.
    pub fn fail_read(&mut self, row: RowId, seq: u64) -> bool {
        let Some(entry) = self.rows.iter_mut().find(|r| r.id == row) else {
            return false;
        };
        match &entry.slot {
            RefSlot::Pending { seq: current, .. } if *current == seq => {
                Self::release(&mut self.previews, &entry.slot);
                entry.slot = RefSlot::Empty;
                true
            }
            _ => false,
        }
    }

    /// Removes a row, or clears it when it is the only one.
    pub fn remove(&mut self, row: RowId) {
        let Some(pos) = self.rows.iter().position(|r| r.id == row) else {
            return;
        };
        Self::release(&mut self.previews, &self.rows[pos].slot);
        if self.rows.len() > 1 {
            self.rows.remove(pos);
        } else {
            self.rows[pos].slot = RefSlot::Empty;
        }
    }

    /// Back to a single empty row.
    pub fn clear(&mut self) {
        for row in &self.rows {
            Self::release(&mut self.previews, &row.slot);
        }
        self.rows.clear();
        self.push_empty();
    }

    /// One row per stored data URL plus a trailing empty row while there is room.
    pub fn restore(&mut self, refs: &[String]) {
        self.clear();
        if refs.is_empty() {
            return;
        }
        self.rows.clear();
        for data_url in refs.iter().take(MAX_REFS) {
            let id = self.push_empty();
            if let Some(entry) = self.rows.iter_mut().find(|r| r.id == id) {
                entry.slot = RefSlot::Loaded {
                    data_url: data_url.clone(),
                    preview: None,
                };
            }
        }
        if self.rows.len() < MAX_REFS {
            self.push_empty();
        }
    }

    /// True when any row holds a file or a restored image.
    pub fn has_any(&self) -> bool {
        self.rows.iter().any(|r| r.slot != RefSlot::Empty)
    }

    /// Data URLs known so far, in row order. This is what gets persisted.
    pub fn data_urls(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|r| match &r.slot {
                RefSlot::Loaded { data_url, .. } => Some(data_url.clone()),
                _ => None,
            })
            .collect()
    }

    /// References for a generation request in row order, including files still being read.
    pub fn sources(&self) -> Vec<RefSource> {
        self.rows
            .iter()
            .filter_map(|r| match &r.slot {
                RefSlot::Empty => None,
                RefSlot::Pending { file, .. } => Some(RefSource::Read(file.clone())),
                RefSlot::Loaded { data_url, .. } => Some(RefSource::Ready(data_url.clone())),
            })
            .collect()
    }

    pub fn render_html(&self) -> String {
        self.rows
            .iter()
            .map(|row| {
                let preview = row.slot.preview();
                let hidden = |visible: bool| if visible { "" } else { " hidden" };
                format!(
                    "<div class=\"ref-row flex items-center gap-3 flex-wrap\" data-row=\"{id}\">\
                     <div class=\"ref-preview-wrap{wrap}\"><img class=\"ref-preview{wrap}\" src=\"{src}\" alt=\"\" />\
                     <span class=\"ref-preview-placeholder input-label{placeholder}\">—</span></div>\
                     <input type=\"file\" accept=\"image/*\" class=\"ref-input text-sm file:mr-2 file:py-1.5 \
                     file:px-3 file:rounded file:border-0\" />\
                     <button type=\"button\" class=\"ref-remove{wrap}\" aria-label=\"Удалить референс\">×</button></div>",
                    id = row.id.0,
                    wrap = hidden(preview.is_some()),
                    src = html_escape::encode_double_quoted_attribute(preview.unwrap_or("")),
                    placeholder = hidden(preview.is_none()),
                )
            })
            .collect()
    }
}
