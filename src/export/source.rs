//! Row sources for export operations
//!
//! An export reads either a fixed, pre-ordered list of node ids resolved
//! through a [`RowModel`], or the whole store through a [`PagedQuery`].

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Result, SourceError};
use crate::store::{ColumnKey, Node, NodeStore, node_header};

/// Rows fetched per page when exporting the whole store
pub const DEFAULT_PAGE_SIZE: u64 = 5000;

/// Model resolving node ids to rows for the selected-rows path
#[async_trait]
pub trait RowModel: Send + Sync {
    /// Column names of the current view
    fn row_header(&self) -> Vec<String>;

    /// Row values for one node, in header order
    async fn row_data(&self, id: i64) -> Result<Vec<String>>;
}

/// Where exported rows come from
pub enum Source<'a> {
    /// Pre-materialized ids, exported once each in list order
    FixedIndexList {
        header: Vec<String>,
        ids: Vec<i64>,
        model: &'a dyn RowModel,
    },

    /// Every node of the store, fetched in pages
    PagedQuery(PagedQuery<'a>),
}

impl<'a> Source<'a> {
    /// Fixed list of ids with the model's header
    pub fn fixed(model: &'a dyn RowModel, ids: Vec<i64>) -> Self {
        Source::FixedIndexList {
            header: model.row_header(),
            ids,
            model,
        }
    }

    /// Paged query over the whole store
    pub fn paged(query: PagedQuery<'a>) -> Self {
        Source::PagedQuery(query)
    }
}

/// Ordered, page-by-page query over a node store
pub struct PagedQuery<'a> {
    store: &'a dyn NodeStore,
    columns: &'a [ColumnKey],
    page_size: u64,
}

impl<'a> PagedQuery<'a> {
    /// Create a paged query with the default page size
    pub fn new(store: &'a dyn NodeStore, columns: &'a [ColumnKey]) -> Self {
        Self {
            store,
            columns,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the page size; zero is treated as one
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Rows requested per page
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Structural columns followed by the custom columns
    pub fn header(&self) -> Vec<String> {
        node_header(self.columns)
    }

    /// Total number of nodes, re-queried from the store
    pub async fn total(&self) -> Result<u64> {
        self.store.count().await
    }

    /// Fetch the page at `index`
    pub async fn page(&self, index: u64) -> Result<Vec<Node>> {
        let offset = index * self.page_size;
        debug!("Fetching page #{} (offset {})", index + 1, offset);
        self.store.fetch_page(offset, self.page_size).await
    }

    /// Row values of a node in header order
    pub fn row(&self, node: &Node) -> Vec<String> {
        node.cells(self.columns)
    }
}

/// Tree view over a node store, used for selected-node exports
pub struct TreeModel<'a> {
    store: &'a dyn NodeStore,
    columns: &'a [ColumnKey],
}

impl<'a> TreeModel<'a> {
    /// Create a tree model showing the given custom columns
    pub fn new(store: &'a dyn NodeStore, columns: &'a [ColumnKey]) -> Self {
        Self { store, columns }
    }

    /// Expand a selection to the selected nodes and all their descendants
    ///
    /// Rows follow tree order whatever the order of the selection: selected
    /// nodes by their position in the tree, then depth-first with children
    /// by id. Each node appears at most once. An unknown selected id is an
    /// error.
    pub async fn selected_with_children(&self, selected: &[i64]) -> Result<Vec<i64>> {
        let mut roots = Vec::with_capacity(selected.len());
        for &id in selected {
            let node = self
                .store
                .find(id)
                .await?
                .ok_or(SourceError::NodeNotFound(id))?;
            roots.push(self.tree_path(node).await?);
        }
        roots.sort();

        let mut ordered = Vec::new();
        let mut seen = HashSet::new();

        for path in roots {
            let Some(&root) = path.last() else {
                continue;
            };
            if seen.contains(&root) {
                continue;
            }

            let mut stack = vec![root];
            while let Some(id) = stack.pop() {
                if !seen.insert(id) {
                    continue;
                }
                ordered.push(id);

                let children = self.store.children(id).await?;
                stack.extend(children.iter().rev().map(|child| child.id));
            }
        }

        debug!(
            "Expanded {} selected nodes to {} rows",
            selected.len(),
            ordered.len()
        );
        Ok(ordered)
    }

    /// Ids from the top-level ancestor down to `node`
    ///
    /// Comparing two paths orders nodes as a depth-first walk of the tree
    /// would. The walk stops at a missing parent or a parent cycle.
    async fn tree_path(&self, node: Node) -> Result<Vec<i64>> {
        let mut path = vec![node.id];
        let mut parent = node.parent_id;

        while let Some(id) = parent {
            if path.contains(&id) {
                break;
            }
            let Some(ancestor) = self.store.find(id).await? else {
                break;
            };
            path.push(ancestor.id);
            parent = ancestor.parent_id;
        }

        path.reverse();
        Ok(path)
    }
}

#[async_trait]
impl RowModel for TreeModel<'_> {
    fn row_header(&self) -> Vec<String> {
        node_header(self.columns)
    }

    async fn row_data(&self, id: i64) -> Result<Vec<String>> {
        let node = self
            .store
            .find(id)
            .await?
            .ok_or(SourceError::NodeNotFound(id))?;
        Ok(node.cells(self.columns))
    }
}
