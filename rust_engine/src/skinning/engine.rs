//! 异步蒙皮引擎：start / wait 协议

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use glam::Mat4;
use rayon::prelude::*;

use super::{skin_range, split_ranges, SkinContext};
use crate::skeleton::SkeletonView;

/// 异步蒙皮任务句柄
///
/// 同一时刻最多一个任务在执行。`start` 把 `SkinContext` 移入任务，
/// `wait` 阻塞到任务结束并交还上下文。
pub struct AsyncSkinContext {
    job: Option<Receiver<SkinContext>>,
    chunk_vertices: usize,
}

impl AsyncSkinContext {
    pub fn new(chunk_vertices: usize) -> Self {
        Self {
            job: None,
            chunk_vertices: chunk_vertices.max(1),
        }
    }

    /// 是否有尚未 `wait` 的任务
    pub fn in_flight(&self) -> bool {
        self.job.is_some()
    }

    /// 启动蒙皮任务，立即返回
    pub fn start(&mut self, skeleton: &SkeletonView, ctx: SkinContext) {
        debug_assert!(
            self.job.is_none(),
            "skinning job started while another job is in flight"
        );
        if self.job.is_some() {
            log::error!("上一个蒙皮任务尚未 wait，先等待其结束");
            self.wait(None);
        }

        let matrices = skeleton.shared_matrices();
        let chunk_vertices = self.chunk_vertices;
        let (sender, receiver) = mpsc::channel();
        rayon::spawn(move || {
            let mut ctx = ctx;
            run_job(&mut ctx, &matrices, chunk_vertices);
            // 接收端已被丢弃时结果无人需要
            let _ = sender.send(ctx);
        });
        self.job = Some(receiver);
    }

    /// 等待任务结束
    ///
    /// 依次执行上下文的 `finish` 钩子、`completion` 回调，清空钩子后交还上下文。
    /// 没有任务时直接返回 `None`。
    pub fn wait(&mut self, completion: Option<&mut dyn FnMut(&SkinContext)>) -> Option<SkinContext> {
        let receiver = self.job.take()?;
        let mut ctx = match receiver.recv() {
            Ok(ctx) => ctx,
            Err(_) => {
                log::error!("蒙皮任务异常终止，输出流已丢失");
                return None;
            }
        };

        if let Some(finish) = ctx.finish.take() {
            finish(&ctx);
        }
        ctx.clear_hooks();
        if let Some(completion) = completion {
            completion(&ctx);
        }
        Some(ctx)
    }
}

impl Drop for AsyncSkinContext {
    fn drop(&mut self) {
        if self.job.is_some() {
            log::warn!("AsyncSkinContext 在任务执行中被释放，等待任务结束");
            self.wait(None);
        }
    }
}

fn run_job(ctx: &mut SkinContext, matrices: &Arc<Vec<Mat4>>, chunk_vertices: usize) {
    let SkinContext {
        mesh,
        influences,
        outputs,
        pre_process,
        post_process,
        ..
    } = ctx;

    let bind = &mesh.streams;
    let view = influences.as_ref().map(|codec| codec.view());
    let pre_process = pre_process.as_ref();
    let post_process = post_process.as_ref();
    let matrices = matrices.as_slice();

    split_ranges(outputs, chunk_vertices)
        .into_par_iter()
        .for_each(|mut range| {
            if let Some(hook) = pre_process {
                hook(&mut range);
            }
            if let Some(view) = view {
                skin_range(&mut range, bind, view, matrices);
            }
            if let Some(hook) = post_process {
                hook(&mut range);
            }
        });
}
