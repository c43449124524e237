use std::sync::Arc;

use gateway::{
    store::{EntityStore, PageSource},
    Entity, GatewayResult, ListResponse, SearchFilter,
};

use crate::{
    dialog::{Confirmation, DialogOutcome},
    edit::failure_message,
    format::capitalized,
    pagination::Pager,
    ActionOutcome, Ui,
};

/// A paginated, filterable view over one backend collection.
pub struct ListController<E: Entity> {
    source: Arc<dyn PageSource<E>>,
    store: Arc<dyn EntityStore<E>>,
    ui: Ui,
    pager: Pager,
    filter: Option<SearchFilter>,
    rows: Vec<E>,
}

impl<E: Entity> ListController<E> {
    pub fn new(
        source: Arc<dyn PageSource<E>>,
        store: Arc<dyn EntityStore<E>>,
        ui: Ui,
        items_per_page: u64,
    ) -> Self {
        Self {
            source,
            store,
            ui,
            pager: Pager::new(items_per_page),
            filter: None,
            rows: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[E] {
        &self.rows
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn filter(&self) -> Option<&SearchFilter> {
        self.filter.as_ref()
    }

    /// One page, from the "list all" endpoint without a filter and from search otherwise.
    pub async fn search(
        &self,
        start_index: u64,
        count: u64,
        filter: Option<&SearchFilter>,
    ) -> GatewayResult<ListResponse<E>> {
        match filter {
            Some(filter) if !filter.value.trim().is_empty() => {
                self.source.search(filter, start_index, count).await
            }
            _ => self.source.list(start_index, count).await,
        }
    }

    /// Fetches the current page, stepping back one page first if deletions
    /// have left it past the end of the results.
    #[tracing::instrument(skip_all, fields(kind = E::KIND))]
    pub async fn change_page(&mut self) -> ActionOutcome {
        if self.pager.step_back_if_past_end() {
            tracing::debug!(page = self.pager.current_page(), "stepped back");
        }
        let filter = self.filter.clone();
        match self
            .search(
                self.pager.start_index(),
                self.pager.items_per_page(),
                filter.as_ref(),
            )
            .await
        {
            Ok(page) => {
                self.pager.set_total(page.total_results);
                self.rows = page.resources;
                ActionOutcome::Done
            }
            Err(err) => {
                tracing::error!("{err:?}");
                let verb = if filter.is_some() { "searching" } else { "retrieving" };
                self.ui.sink.error(&format!("Error {verb} {}!", E::PLURAL));
                ActionOutcome::Failed
            }
        }
    }

    /// A page past the end lands on the last page, refetching once if the
    /// total was only learned from the first fetch.
    pub async fn go_to_page(&mut self, page: u64) -> ActionOutcome {
        self.pager.go_to(page);
        self.pager.clamp_to_last_page();
        let outcome = self.change_page().await;
        let fetched = self.pager.current_page();
        self.pager.clamp_to_last_page();
        if outcome.is_done() && self.pager.current_page() != fetched {
            return self.change_page().await;
        }
        outcome
    }

    /// A blank value clears the filter.
    pub async fn set_filter(&mut self, filter: SearchFilter) -> ActionOutcome {
        self.filter = Some(filter).filter(|f| !f.value.trim().is_empty());
        self.pager.go_to(1);
        self.change_page().await
    }

    pub async fn reset_filter(&mut self) -> ActionOutcome {
        self.filter = None;
        self.change_page().await
    }

    #[tracing::instrument(skip_all, fields(kind = E::KIND))]
    pub async fn delete_row(&mut self, entity: &E) -> ActionOutcome {
        let Some(id) = entity.id() else {
            self.ui.sink.error(&format!(
                "{} has not been saved yet",
                capitalized(E::KIND)
            ));
            return ActionOutcome::Failed;
        };
        let label = entity.label();
        let confirmation = Confirmation {
            header: format!("Delete {} {label}", E::KIND),
            body: format!("Are you sure you want to delete {} '{label}'?", E::KIND),
            action: format!("Delete {}", E::KIND),
        };
        match self.ui.dialogs.confirm(confirmation).await {
            DialogOutcome::Confirmed(()) => {}
            DialogOutcome::Cancelled => return ActionOutcome::Cancelled,
            DialogOutcome::Failed(reason) => {
                self.ui.sink.error(&reason);
                return ActionOutcome::Failed;
            }
        }

        if let Err(err) = self.store.remove(&id).await {
            tracing::error!("{err:?}");
            self.ui.sink.error(&failure_message("deleting", E::KIND, &err));
            return ActionOutcome::Failed;
        }
        self.ui
            .sink
            .success(&format!("{} deleted!", capitalized(E::KIND)));
        self.pager.item_removed();
        self.change_page().await
    }
}
