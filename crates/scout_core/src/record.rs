/// Column names of the output file, in write order.
pub const RECORD_HEADER: [&str; 12] = [
    "id",
    "text",
    "created_at",
    "author_id",
    "author_username",
    "retweet_count",
    "like_count",
    "reply_count",
    "media_urls",
    "urls",
    "has_media",
    "media_types",
];

/// Separator used to flatten list fields into a single cell.
pub const LIST_SEPARATOR: &str = "|";

/// One collected post, flattened to the output schema.
///
/// Built once by an extractor through [`Record::new`] and the `with_*`
/// methods; read-only afterwards. Optional source attributes stay `None` and
/// are written as empty cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: String,
    text: String,
    created_at: Option<String>,
    author_id: String,
    author_username: Option<String>,
    retweet_count: Option<u64>,
    like_count: Option<u64>,
    reply_count: Option<u64>,
    media_urls: Vec<String>,
    urls: Vec<String>,
    media_types: Vec<String>,
}

impl Record {
    pub fn new(id: impl Into<String>, author_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: String::new(),
            created_at: None,
            author_id: author_id.into(),
            author_username: None,
            retweet_count: None,
            like_count: None,
            reply_count: None,
            media_urls: Vec::new(),
            urls: Vec::new(),
            media_types: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_created_at(mut self, created_at: Option<String>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_author_username(mut self, username: Option<String>) -> Self {
        self.author_username = username;
        self
    }

    /// Retweet, like and reply counts, in that order.
    pub fn with_counts(
        mut self,
        retweets: Option<u64>,
        likes: Option<u64>,
        replies: Option<u64>,
    ) -> Self {
        self.retweet_count = retweets;
        self.like_count = likes;
        self.reply_count = replies;
        self
    }

    /// `types` holds one entry per attachment; `urls` only the usable ones.
    pub fn with_media(mut self, urls: Vec<String>, types: Vec<String>) -> Self {
        self.media_urls = urls;
        self.media_types = types;
        self
    }

    pub fn with_urls(mut self, urls: Vec<String>) -> Self {
        self.urls = urls;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> Option<&str> {
        self.created_at.as_deref()
    }

    pub fn author_id(&self) -> &str {
        &self.author_id
    }

    pub fn author_username(&self) -> Option<&str> {
        self.author_username.as_deref()
    }

    pub fn retweet_count(&self) -> Option<u64> {
        self.retweet_count
    }

    pub fn like_count(&self) -> Option<u64> {
        self.like_count
    }

    pub fn reply_count(&self) -> Option<u64> {
        self.reply_count
    }

    pub fn media_urls(&self) -> &[String] {
        &self.media_urls
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn media_types(&self) -> &[String] {
        &self.media_types
    }

    /// `true` once any media attachment was seen, even one without a usable url.
    pub fn has_media(&self) -> bool {
        !self.media_types.is_empty()
    }

    /// Render the record as one row matching [`RECORD_HEADER`].
    pub fn to_row(&self) -> [String; 12] {
        [
            self.id.clone(),
            self.text.clone(),
            self.created_at.clone().unwrap_or_default(),
            self.author_id.clone(),
            self.author_username.clone().unwrap_or_default(),
            count_cell(self.retweet_count),
            count_cell(self.like_count),
            count_cell(self.reply_count),
            self.media_urls.join(LIST_SEPARATOR),
            self.urls.join(LIST_SEPARATOR),
            if self.has_media() { "True" } else { "False" }.to_string(),
            self.media_types.join(LIST_SEPARATOR),
        ]
    }
}

fn count_cell(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
