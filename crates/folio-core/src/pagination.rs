//! Pagination Engine
//!
//! Pages are a derived projection of the block order, rebuilt or incrementally corrected from
//! measured heights. Nothing here touches the [`BlockStore`]; the engine only decides which block
//! ids sit on which page.
//!
//! # Model
//!
//! - The document is cut into *sections* by `page-break` blocks (the break stays at the end of
//!   its section). A `cover` block always forms a section and a page of its own.
//! - A block contributes its measured height plus [`PageConfig::block_margin`] to its page; a
//!   page break contributes nothing.
//! - **Overflow**: the first block whose running total exceeds `content_height` and everything
//!   after it move to the start of the next page. Headings immediately above the cut follow
//!   them, so a page never ends with a heading while the section continues.
//! - **Underflow**: while `content_height - overflow_buffer - used > 0`, the first block of the
//!   next page is pulled back if it fits under that lowered limit. A heading is only pulled
//!   together with the block it introduces. The buffer gap between the push and pull limits keeps
//!   a block sitting exactly at the threshold from flapping.
//! - A page that overflowed is not pulled into again until `reflow_cooldown` has passed; the
//!   report flags such skipped pulls as `deferred` so the caller can retry later.
//!
//! # Example
//!
//! ```rust
//! use std::time::Instant;
//! use folio_core::{BlockDraft, BlockStore, PageConfig, PaginationEngine};
//!
//! let store = BlockStore::from_drafts((0..5).map(|i| BlockDraft::paragraph(format!("p{i}"))));
//! let config = PageConfig { content_height: 100.0, block_margin: 0.0, ..PageConfig::default() };
//! let mut engine = PaginationEngine::new(config);
//! let fixed = |_: &folio_core::Block| Some(30.0);
//!
//! engine.rebuild(&store, &fixed, Instant::now()).unwrap();
//! assert_eq!(engine.page_count(), 2);
//! assert_eq!(engine.pages()[0].blocks().len(), 3);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, trace};

use crate::block::{BlockId, BlockType};
use crate::config::PageConfig;
use crate::layout::HeightMeasurer;
use crate::store::BlockStore;

/// Stable identity of a page across reflows (page numbers shift, ids do not).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(u64);

/// Page flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Dedicated cover page, exempt from reflow.
    Cover,
    /// Regular content page.
    Content,
}

/// One page of the settled layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    id: PageId,
    number: usize,
    kind: PageKind,
    blocks: Vec<BlockId>,
}

impl Page {
    fn new(id: PageId, kind: PageKind) -> Self {
        Self {
            id,
            number: 0,
            kind,
            blocks: Vec::new(),
        }
    }

    /// Stable id.
    pub fn id(&self) -> PageId {
        self.id
    }

    /// 1-based page number.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Page flavour.
    pub fn kind(&self) -> PageKind {
        self.kind
    }

    /// Blocks on this page, in document order.
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }
}

/// Direction of a block move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// Pushed to a later page (overflow).
    Forward,
    /// Pulled to an earlier page (underflow).
    Backward,
}

/// A block relocated by a reflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMove {
    /// Moved block.
    pub block: BlockId,
    /// Push or pull.
    pub direction: MoveDirection,
    /// Page number holding the block after the reflow.
    pub page: usize,
}

/// Summary of one reflow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReflowReport {
    /// Every relocation, in the order it happened.
    pub moves: Vec<BlockMove>,
    /// Pages that did not exist before.
    pub pages_created: usize,
    /// Pages that disappeared.
    pub pages_removed: usize,
    /// An underflow pull was skipped because the receiving page is cooling down.
    pub deferred: bool,
}

impl ReflowReport {
    /// Whether the partition changed.
    pub fn changed(&self) -> bool {
        !self.moves.is_empty() || self.pages_created > 0 || self.pages_removed > 0
    }
}

/// Why a reflow did not run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReflowRejected {
    /// Another reflow holds the gate.
    #[error("a reflow is already in progress")]
    InProgress,
    /// The measurer could not report a height for this block.
    #[error("block {0} has no measured height yet")]
    Unmeasured(BlockId),
}

/// Single-writer gate for reflows.
///
/// Clones share state, so a view adapter that is called back while measuring can hold a handle
/// and see that a reflow is running.
#[derive(Debug, Clone, Default)]
pub struct ReflowGate {
    active: Arc<AtomicBool>,
}

impl ReflowGate {
    /// Open gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate. Fails with [`ReflowRejected::InProgress`] while another ticket is alive.
    pub fn begin(&self) -> Result<ReflowTicket, ReflowRejected> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ReflowRejected::InProgress)?;
        Ok(ReflowTicket {
            active: Arc::clone(&self.active),
        })
    }

    /// Whether a ticket is outstanding.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Held for the duration of a reflow; dropping it reopens the gate.
#[derive(Debug)]
pub struct ReflowTicket {
    active: Arc<AtomicBool>,
}

impl Drop for ReflowTicket {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy)]
struct Measured {
    block_type: BlockType,
    height: f64,
    contribution: f64,
}

type Metrics<'a> = HashMap<&'a BlockId, Measured>;

struct Section {
    kind: PageKind,
    pages: Vec<Page>,
}

/// Assigns blocks to pages.
#[derive(Debug, Clone)]
pub struct PaginationEngine {
    config: PageConfig,
    pages: Vec<Page>,
    gate: ReflowGate,
    next_page_id: u64,
    last_overflow: HashMap<PageId, Instant>,
}

impl PaginationEngine {
    /// Engine with no pages yet.
    pub fn new(config: PageConfig) -> Self {
        Self {
            config,
            pages: Vec::new(),
            gate: ReflowGate::new(),
            next_page_id: 0,
            last_overflow: HashMap::new(),
        }
    }

    /// Page geometry.
    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    /// Replace page geometry; takes effect on the next reflow.
    pub fn set_config(&mut self, config: PageConfig) {
        self.config = config;
    }

    /// A handle to the reentrancy gate.
    pub fn gate(&self) -> ReflowGate {
        self.gate.clone()
    }

    /// Current pages.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Page number holding `id`.
    pub fn page_of(&self, id: &BlockId) -> Option<usize> {
        self.pages
            .iter()
            .find(|p| p.blocks.contains(id))
            .map(|p| p.number)
    }

    /// Used height of every page (heights plus margins), in page order.
    pub fn page_heights<M>(&self, store: &BlockStore, measurer: &M) -> Option<Vec<f64>>
    where
        M: HeightMeasurer + ?Sized,
    {
        self.pages
            .iter()
            .map(|page| {
                page.blocks.iter().try_fold(0.0, |total, id| {
                    let block = store.get(id)?;
                    let contribution = if block.block_type() == BlockType::PageBreak {
                        0.0
                    } else {
                        measurer.measure(block)? + self.config.block_margin
                    };
                    Some(total + contribution)
                })
            })
            .collect()
    }

    /// Forget all pages and cooldowns.
    pub fn clear(&mut self) {
        self.pages.clear();
        self.last_overflow.clear();
    }

    /// Paginate from scratch.
    pub fn rebuild<M>(
        &mut self,
        store: &BlockStore,
        measurer: &M,
        now: Instant,
    ) -> Result<ReflowReport, ReflowRejected>
    where
        M: HeightMeasurer + ?Sized,
    {
        if self.gate.is_active() {
            return Err(ReflowRejected::InProgress);
        }
        let previous = self.pages.len();
        self.clear();
        let mut report = self.reflow(store, measurer, now)?;
        report.pages_removed = previous;
        Ok(report)
    }

    /// Correct the current pages after the document changed.
    ///
    /// Blocks stay on the page they were on where possible; new blocks join the page of the block
    /// before them. Then the overflow pass and the underflow pass run over every content section.
    pub fn reflow<M>(
        &mut self,
        store: &BlockStore,
        measurer: &M,
        now: Instant,
    ) -> Result<ReflowReport, ReflowRejected>
    where
        M: HeightMeasurer + ?Sized,
    {
        let _ticket = self.gate.begin()?;

        let mut metrics: Metrics<'_> = HashMap::with_capacity(store.len());
        for block in store.iter() {
            let height = measurer
                .measure(block)
                .ok_or_else(|| ReflowRejected::Unmeasured(block.id().clone()))?;
            let contribution = if block.block_type() == BlockType::PageBreak {
                0.0
            } else {
                height + self.config.block_margin
            };
            metrics.insert(
                block.id(),
                Measured {
                    block_type: block.block_type(),
                    height,
                    contribution,
                },
            );
        }

        let before: HashSet<PageId> = self.pages.iter().map(|p| p.id).collect();
        let mut sections = self.sync(store);
        let mut moves: Vec<(BlockId, MoveDirection)> = Vec::new();
        let mut deferred = false;

        for section in sections.iter_mut().filter(|s| s.kind == PageKind::Content) {
            self.overflow_pass(&mut section.pages, &metrics, now, &mut moves);
            self.underflow_pass(&mut section.pages, &metrics, now, &mut moves, &mut deferred);
        }

        let mut pages: Vec<Page> = sections
            .into_iter()
            .flat_map(|s| s.pages)
            .filter(|p| !p.blocks.is_empty())
            .collect();
        for (index, page) in pages.iter_mut().enumerate() {
            page.number = index + 1;
        }
        self.pages = pages;

        let after: HashSet<PageId> = self.pages.iter().map(|p| p.id).collect();
        let cooldown = self.config.reflow_cooldown();
        self.last_overflow
            .retain(|id, at| after.contains(id) && now.saturating_duration_since(*at) < cooldown);

        let moves = moves
            .into_iter()
            .map(|(block, direction)| {
                let page = self.page_of(&block).unwrap_or(0);
                BlockMove {
                    block,
                    direction,
                    page,
                }
            })
            .collect::<Vec<_>>();

        let report = ReflowReport {
            moves,
            pages_created: after.difference(&before).count(),
            pages_removed: before.difference(&after).count(),
            deferred,
        };
        if report.changed() || report.deferred {
            debug!(
                pages = self.pages.len(),
                moves = report.moves.len(),
                created = report.pages_created,
                removed = report.pages_removed,
                deferred = report.deferred,
                "reflow"
            );
        }
        Ok(report)
    }

    fn allocate_page(&mut self, kind: PageKind) -> Page {
        let id = PageId(self.next_page_id);
        self.next_page_id += 1;
        Page::new(id, kind)
    }

    /// Project the current block order onto the previous partition.
    fn sync(&mut self, store: &BlockStore) -> Vec<Section> {
        let previous: HashMap<BlockId, PageId> = self
            .pages
            .iter()
            .flat_map(|p| p.blocks.iter().map(move |b| (b.clone(), p.id)))
            .collect();

        let mut sections: Vec<Section> = Vec::new();
        let mut used: HashSet<PageId> = HashSet::new();
        let mut open = false;

        for block in store.iter() {
            let id = block.id();
            let prior = previous.get(id).copied().filter(|p| !used.contains(p));

            if block.block_type() == BlockType::Cover {
                let mut page = match prior {
                    Some(page_id) => Page::new(page_id, PageKind::Cover),
                    None => self.allocate_page(PageKind::Cover),
                };
                used.insert(page.id);
                page.blocks.push(id.clone());
                sections.push(Section {
                    kind: PageKind::Cover,
                    pages: vec![page],
                });
                open = false;
                continue;
            }

            if !open {
                let page = match prior {
                    Some(page_id) => Page::new(page_id, PageKind::Content),
                    None => self.allocate_page(PageKind::Content),
                };
                used.insert(page.id);
                sections.push(Section {
                    kind: PageKind::Content,
                    pages: vec![page],
                });
                open = true;
            } else if let Some(page_id) = prior {
                // The block sat on a later page that has not been opened yet.
                used.insert(page_id);
                if let Some(section) = sections.last_mut() {
                    section.pages.push(Page::new(page_id, PageKind::Content));
                }
            }

            if let Some(page) = sections.last_mut().and_then(|s| s.pages.last_mut()) {
                page.blocks.push(id.clone());
            }
            if block.block_type() == BlockType::PageBreak {
                open = false;
            }
        }

        sections
    }

    fn is_cooling(&self, page: PageId, now: Instant) -> bool {
        let cooldown = self.config.reflow_cooldown();
        self.last_overflow
            .get(&page)
            .is_some_and(|at| now.saturating_duration_since(*at) < cooldown)
    }

    fn overflow_pass(
        &mut self,
        pages: &mut Vec<Page>,
        metrics: &Metrics<'_>,
        now: Instant,
        moves: &mut Vec<(BlockId, MoveDirection)>,
    ) {
        let mut index = 0;
        while index < pages.len() {
            let has_following = index + 1 < pages.len();
            let Some(cut) = self.split_point(&pages[index].blocks, metrics, has_following) else {
                index += 1;
                continue;
            };

            let pushed = pages[index].blocks.split_off(cut);
            self.last_overflow.insert(pages[index].id, now);
            if !has_following {
                let page = self.allocate_page(PageKind::Content);
                pages.push(page);
            }
            trace!(
                count = pushed.len(),
                from = index,
                "pushing blocks to the next page"
            );
            moves.extend(pushed.iter().map(|b| (b.clone(), MoveDirection::Forward)));
            let rest = std::mem::take(&mut pages[index + 1].blocks);
            pages[index + 1].blocks = pushed.into_iter().chain(rest).collect();
            index += 1;
        }
    }

    /// Index of the first block that has to leave the page, if any.
    fn split_point(
        &self,
        blocks: &[BlockId],
        metrics: &Metrics<'_>,
        has_following: bool,
    ) -> Option<usize> {
        let limit = self.config.content_height;
        let mut total = 0.0;
        let mut overflow = None;
        for (index, id) in blocks.iter().enumerate() {
            total += contribution(metrics, id);
            if total > limit {
                overflow = Some(index);
                break;
            }
        }

        let mut cut = match overflow {
            // A single block taller than the page stays where it is.
            Some(index) => index.max(1),
            None if has_following => blocks.len(),
            None => return None,
        };

        while cut > 1 && is_heading(metrics, &blocks[cut - 1]) {
            let above: f64 = blocks[..cut - 1].iter().map(|id| height(metrics, id)).sum();
            if above < self.config.min_content_above_heading {
                break;
            }
            cut -= 1;
        }

        let movable = blocks
            .get(cut..)
            .is_some_and(|rest| rest.iter().any(|id| !is_page_break(metrics, id)));
        movable.then_some(cut)
    }

    fn underflow_pass(
        &self,
        pages: &mut Vec<Page>,
        metrics: &Metrics<'_>,
        now: Instant,
        moves: &mut Vec<(BlockId, MoveDirection)>,
        deferred: &mut bool,
    ) {
        let budget = self.config.content_height - self.config.overflow_buffer;
        let mut index = 0;
        while index + 1 < pages.len() {
            let cooling = self.is_cooling(pages[index].id, now);
            loop {
                let Some(next) = pages.get(index + 1) else {
                    break;
                };
                if next.blocks.is_empty() {
                    pages.remove(index + 1);
                    continue;
                }

                let used: f64 = pages[index]
                    .blocks
                    .iter()
                    .map(|id| contribution(metrics, id))
                    .sum();
                if budget - used <= 0.0 {
                    break;
                }

                // Headings travel with the block they introduce.
                let leading_headings = next
                    .blocks
                    .iter()
                    .take_while(|id| is_heading(metrics, id))
                    .count();
                let take = leading_headings + 1;
                if take > next.blocks.len() {
                    break;
                }
                let need: f64 = next.blocks[..take]
                    .iter()
                    .map(|id| contribution(metrics, id))
                    .sum();
                if used + need > budget {
                    break;
                }
                if cooling {
                    *deferred = true;
                    trace!(page = index, "underflow deferred by cooldown");
                    break;
                }

                let pulled: Vec<BlockId> = pages[index + 1].blocks.drain(..take).collect();
                moves.extend(pulled.iter().map(|b| (b.clone(), MoveDirection::Backward)));
                pages[index].blocks.extend(pulled);
            }
            index += 1;
        }
    }
}

fn contribution(metrics: &Metrics<'_>, id: &BlockId) -> f64 {
    metrics.get(id).map_or(0.0, |m| m.contribution)
}

fn height(metrics: &Metrics<'_>, id: &BlockId) -> f64 {
    metrics.get(id).map_or(0.0, |m| m.height)
}

fn is_heading(metrics: &Metrics<'_>, id: &BlockId) -> bool {
    metrics.get(id).is_some_and(|m| m.block_type.is_heading())
}

fn is_page_break(metrics: &Metrics<'_>, id: &BlockId) -> bool {
    metrics
        .get(id)
        .is_some_and(|m| m.block_type == BlockType::PageBreak)
}
