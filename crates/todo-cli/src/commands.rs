use anyhow::{bail, Context, Result};
use domain::{Tab, TodoError, TodoId, TodoItem};
use infrastructure::TodoStore;
use shared::ErrorReport;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use view_models::{
    CreateFormViewModel, ListInvalidation, Navigation, Outcome, SubmitOutcome, TodoDetailViewModel,
    TodoListViewModel,
};

use crate::args::{Command, EditArgs, USAGE};

/// 削除前の確認。`true` なら削除する
pub trait Confirm {
    fn confirm(&mut self, item: &TodoItem) -> std::io::Result<bool>;
}

impl<F> Confirm for F
where
    F: FnMut(&TodoItem) -> std::io::Result<bool>,
{
    fn confirm(&mut self, item: &TodoItem) -> std::io::Result<bool> {
        self(item)
    }
}

/// コマンドの実行に必要なもの
pub struct App<S, W> {
    store: Arc<S>,
    invalidation: ListInvalidation,
    page_size: u32,
    out: W,
}

impl<S: TodoStore, W: Write> App<S, W> {
    pub fn new(store: Arc<S>, page_size: u32, out: W) -> Self {
        Self {
            store,
            invalidation: ListInvalidation::new(),
            page_size,
            out,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub async fn run(&mut self, command: Command, confirm: &mut impl Confirm) -> Result<()> {
        debug!(?command, "Running command");
        match command {
            Command::List => self.list().await,
            Command::Add { title } => self.add(title).await,
            Command::Toggle { id } => self.toggle(&id).await,
            Command::Show { id } => self.show(&id).await,
            Command::Edit { id, edit } => self.edit(&id, edit).await,
            Command::Attach { id, path } => self.attach(&id, &path).await,
            Command::Delete { id, yes } => self.delete(&id, yes, confirm).await,
            Command::Help => {
                writeln!(self.out, "{USAGE}")?;
                Ok(())
            }
        }
    }

    async fn list(&mut self) -> Result<()> {
        let mut list = TodoListViewModel::new(self.store.clone(), &self.invalidation, self.page_size);
        list.refresh().await.map_err(|e| failure(e, list.error()))?;

        for tab in [Tab::Todo, Tab::Done] {
            writeln!(self.out, "{}", tab.label())?;
            match list.empty_state(tab) {
                Some(empty) => writeln!(self.out, "  {} {}", empty.message, empty.hint)?,
                None => {
                    for item in list.tab(tab) {
                        writeln!(self.out, "  {}", line(item))?;
                    }
                }
            }
        }
        Ok(())
    }

    async fn add(&mut self, title: String) -> Result<()> {
        let mut form = CreateFormViewModel::new(self.store.clone(), self.invalidation.clone());
        form.set_draft_title(title);

        match form.submit().await.map_err(|e| failure(e, form.error()))? {
            Outcome::Applied(SubmitOutcome::Created(item)) => writeln!(self.out, "added {}", line(&item))?,
            Outcome::Applied(SubmitOutcome::Skipped) => writeln!(self.out, "nothing to add")?,
            Outcome::Stale => {}
        }
        Ok(())
    }

    async fn toggle(&mut self, id: &TodoId) -> Result<()> {
        let mut list = TodoListViewModel::new(self.store.clone(), &self.invalidation, self.page_size);
        list.refresh().await.map_err(|e| failure(e, list.error()))?;

        let outcome = list
            .toggle_completion(id)
            .await
            .map_err(|e| failure(e, list.error()))?;
        if let Some(item) = outcome.applied() {
            writeln!(self.out, "{}", line(&item))?;
        }
        Ok(())
    }

    async fn show(&mut self, id: &TodoId) -> Result<()> {
        let detail = self.open(id).await?;
        let Some(item) = detail.draft() else {
            return Ok(());
        };

        writeln!(self.out, "{}", line(item))?;
        if !item.memo.is_empty() {
            writeln!(self.out, "memo:  {}", item.memo)?;
        }
        if let Some(image) = &item.image {
            writeln!(self.out, "image: {image}")?;
        }
        Ok(())
    }

    async fn edit(&mut self, id: &TodoId, edit: EditArgs) -> Result<()> {
        let mut detail = self.open(id).await?;

        if let Some(title) = edit.title {
            detail.set_title(title);
        }
        if let Some(memo) = edit.memo {
            detail.set_memo(memo);
        }
        if let Some(completed) = edit.completed {
            if detail.draft().is_some_and(|d| d.completed != completed) {
                detail.toggle_completion();
            }
        }

        self.save(&mut detail).await
    }

    async fn attach(&mut self, id: &TodoId, path: &Path) -> Result<()> {
        let mut detail = self.open(id).await?;

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("not a file path: {}", path.display()))?;

        detail
            .attach_image(bytes, file_name, mime_type(path))
            .await
            .map_err(|e| failure(e, detail.error()))?;
        self.save(&mut detail).await
    }

    async fn delete(&mut self, id: &TodoId, yes: bool, confirm: &mut impl Confirm) -> Result<()> {
        let mut detail = self.open(id).await?;
        let token = detail.request_delete().map_err(|e| failure(e, detail.error()))?;

        if !yes {
            let confirmed = match detail.draft() {
                Some(item) => confirm.confirm(item)?,
                None => false,
            };
            if !confirmed {
                writeln!(self.out, "cancelled")?;
                return Ok(());
            }
        }

        detail.delete(token).await.map_err(|e| failure(e, detail.error()))?;
        writeln!(self.out, "deleted #{id}")?;
        Ok(())
    }

    /// 詳細画面を開く。存在しなければエラー
    async fn open(&self, id: &TodoId) -> Result<TodoDetailViewModel<S>> {
        let mut detail = TodoDetailViewModel::new(self.store.clone(), self.invalidation.clone());
        let outcome = detail.load(id).await.map_err(|e| failure(e, detail.error()))?;

        if outcome == Outcome::Applied(Navigation::ToList) {
            let message = detail
                .error()
                .map(|r| r.message.clone())
                .unwrap_or_else(|| format!("todo #{id} not found"));
            bail!("{message} (#{id})");
        }
        Ok(detail)
    }

    async fn save(&mut self, detail: &mut TodoDetailViewModel<S>) -> Result<()> {
        detail.save().await.map_err(|e| failure(e, detail.error()))?;
        if let Some(item) = detail.draft() {
            writeln!(self.out, "saved {}", line(item))?;
        }
        Ok(())
    }
}

/// 一覧・結果表示の 1 行
pub fn line(item: &TodoItem) -> String {
    let mark = if item.completed { "x" } else { " " };
    format!("[{mark}] #{} {}", item.id, item.title)
}

/// 拡張子から MIME タイプを推定
pub fn mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// ユーザー向けメッセージを先頭に付けたエラー
fn failure(error: TodoError, report: Option<&ErrorReport>) -> anyhow::Error {
    match report {
        Some(report) => anyhow::Error::new(error).context(report.message.clone()),
        None => anyhow::Error::new(error),
    }
}
