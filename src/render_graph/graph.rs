//! Pass registration and a reference host that drives the pass lifecycle.

use log::{error, trace};

use crate::render_graph::{CommandBuffer, FrameContext, PassError, RenderContext, RenderPass};

/// Host-side queue that passes are enqueued into each frame.
///
/// The host owns the order: passes run in exactly the order they were
/// enqueued.
pub trait PassQueue<'p> {
    fn enqueue_pass(&mut self, pass: &'p mut dyn RenderPass);
}

impl<'p> PassQueue<'p> for Vec<&'p mut dyn RenderPass> {
    fn enqueue_pass(&mut self, pass: &'p mut dyn RenderPass) {
        self.push(pass);
    }
}

/// A minimal host: collects passes for one frame and runs them.
///
/// For each pass, in enqueue order:
///
/// ```text
/// setup ─▶ submit ─▶ execute ─▶ cleanup ─▶ submit
/// ```
///
/// A failed `setup` is fatal for the frame: the failing pass still gets its
/// `cleanup`, but its `execute` and every later pass are skipped, so nothing
/// downstream samples or presents a target that was never allocated.
///
/// # Example
///
/// ```ignore
/// let mut scheduler = PassScheduler::new();
/// pipeline.register(&mut scheduler);
/// scheduler.run(&mut gpu_context, &frame)?;
/// ```
pub struct PassScheduler<'p> {
    passes: Vec<&'p mut dyn RenderPass>,
}

impl<'p> PassScheduler<'p> {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Names of the enqueued passes, in run order.
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Runs every enqueued pass once.
    ///
    /// Stops at the first pass whose `setup` fails and returns its error. An
    /// `execute` failure does not stop later passes; the first one is
    /// returned after the frame completes.
    pub fn run(
        &mut self,
        ctx: &mut dyn RenderContext,
        frame: &FrameContext<'_>,
    ) -> Result<(), PassError> {
        let mut first_error = None;
        let total = self.passes.len();

        for (index, pass) in self.passes.iter_mut().enumerate() {
            trace!("running pass '{}'", pass.name());

            let mut cmd = CommandBuffer::new(pass.name());
            let setup = pass.setup(&mut cmd, frame);
            ctx.execute_commands(&mut cmd);

            let result = match setup {
                Ok(()) => pass.execute(ctx, frame),
                Err(err) => {
                    cleanup(&mut **pass, ctx);
                    error!(
                        "{}; abandoning the frame, {} pass(es) skipped",
                        err,
                        total - index - 1
                    );
                    return Err(err);
                }
            };
            cleanup(&mut **pass, ctx);

            if let Err(err) = result {
                error!("{}", err);
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn cleanup(pass: &mut dyn RenderPass, ctx: &mut dyn RenderContext) {
    let mut cmd = CommandBuffer::new(pass.name());
    pass.cleanup(&mut cmd);
    ctx.execute_commands(&mut cmd);
}

impl<'p> PassQueue<'p> for PassScheduler<'p> {
    fn enqueue_pass(&mut self, pass: &'p mut dyn RenderPass) {
        self.passes.push(pass);
    }
}

impl Default for PassScheduler<'_> {
    fn default() -> Self {
        Self::new()
    }
}
