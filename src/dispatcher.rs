use crate::error::Error;
use crate::task::{Context, TaskExecutor, VerificationTask};
use crate::{ExitStatus, RunOptions, TaskKind, TaskSpec, SUCCESS};

// A named group of tasks, kept in registration order
pub struct Category {
    name: String,
    tasks: Vec<Box<dyn TaskExecutor>>,
}

impl Category {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_task(mut self, task: impl TaskExecutor + 'static) -> Self {
        self.tasks.push(Box::new(task));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|task| task.name()).collect()
    }

    fn find(&self, name: &str) -> Option<&dyn TaskExecutor> {
        self.tasks
            .iter()
            .find(|task| task.name() == name)
            .map(|task| &**task)
    }
}

/// Routes a category and optional task to the registered executors and
/// turns the outcome into the exit status of the run.
pub struct Dispatcher<'a> {
    categories: Vec<Category>,
    ctx: Context<'a>,
}

impl<'a> Dispatcher<'a> {
    #[must_use]
    pub fn new(ctx: Context<'a>) -> Self {
        Self {
            categories: Vec::new(),
            ctx,
        }
    }

    // The audit and ci categories with their verification tasks
    #[must_use]
    pub fn with_default_tasks(ctx: Context<'a>) -> Self {
        Self::new(ctx)
            .register(
                Category::new("audit")
                    .with_task(VerificationTask::new(TaskKind::Dependencies))
                    .with_task(VerificationTask::new(TaskKind::CodeQuality)),
            )
            .register(Category::new("ci").with_task(VerificationTask::new(TaskKind::UnitTests)))
    }

    #[must_use]
    pub fn register(mut self, category: Category) -> Self {
        self.categories.push(category);
        self
    }

    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        self.categories.iter().map(Category::name).collect()
    }

    #[must_use]
    pub fn tasks(&self, category: &str) -> Option<Vec<&str>> {
        self.category(category).map(Category::task_names)
    }

    fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Runs the task named by `spec`, or every task of the category in
    /// registration order when no task is named.
    ///
    /// Unknown names and other usage errors are reported and yield `1`.
    /// Otherwise the first non-zero task status is returned as is and the
    /// remaining tasks are skipped.
    pub fn dispatch(&self, spec: &TaskSpec, options: &RunOptions) -> ExitStatus {
        match self.try_dispatch(spec, options) {
            Ok(code) => code,
            Err(e) => {
                self.ctx.diagnostics.error(&e.to_string());
                e.exit_status()
            }
        }
    }

    fn try_dispatch(&self, spec: &TaskSpec, options: &RunOptions) -> Result<ExitStatus, Error> {
        let category = self
            .category(&spec.category)
            .ok_or_else(|| Error::UnknownCategory {
                category: spec.category.clone(),
                known: self.categories().join(", "),
            })?;

        let Some(name) = spec.task.as_deref() else {
            for task in &category.tasks {
                self.ctx
                    .diagnostics
                    .debug(&format!("running {}/{}", category.name, task.name()));
                let code = task.execute(self.ctx, options)?;
                if code != SUCCESS {
                    return Ok(code);
                }
            }
            return Ok(SUCCESS);
        };

        let task = category.find(name).ok_or_else(|| Error::UnknownTask {
            category: category.name.clone(),
            task: name.to_string(),
            known: category.task_names().join(", "),
        })?;
        self.ctx
            .diagnostics
            .debug(&format!("running {}/{name}", category.name));
        task.execute(self.ctx, options)
    }
}
