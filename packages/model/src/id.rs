use crc32fast::Hasher;

/// Derive a stable id seed from a workspace identifier using CRC32.
pub fn workspace_seed(workspace_id: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(workspace_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential node id generator for a single document.
///
/// Ids have the form `{seed}-{n}`. The seed ties ids to their workspace; the
/// counter guarantees uniqueness within a document as long as the generator
/// is advanced past any ids already present (see [`IdGenerator::bump_past`]).
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u32,
}

impl IdGenerator {
    pub fn new(workspace_id: &str) -> Self {
        Self {
            seed: workspace_seed(workspace_id),
            count: 0,
        }
    }

    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            count: 0,
        }
    }

    /// Mint the next node id.
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    /// Advance the counter past an existing id so future ids cannot collide.
    ///
    /// Called for every node id when a document is loaded; ids minted by other
    /// generators (different seed) are ignored.
    pub fn bump_past(&mut self, id: &str) {
        if let Some(rest) = id.strip_prefix(&self.seed) {
            if let Some(n) = rest.strip_prefix('-').and_then(|n| n.parse::<u32>().ok()) {
                self.count = self.count.max(n);
            }
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}
