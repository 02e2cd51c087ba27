// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Batch controller

use futures::future::join_all;

use crate::errors::{PipeworksError, PipeworksResult};
use crate::memory::WorkingMemory;
use crate::pipe::{BatchPipeSpec, Pipe, PipeOutput, PipeRunParams};
use crate::router::{CallStack, PipeRouter};
use crate::stuff::{Stuff, StuffContent};

/// One mapping of a branch pipe over a list in memory
///
/// Shared by batch pipes and batched sequence steps.
pub struct BatchJob<'a> {
    /// Pipe that owns the batch, for error context
    pub caller: &'a str,
    pub branch_pipe_code: &'a str,
    pub input_list_name: &'a str,
    pub input_item_name: &'a str,
    /// Name the result list is stored under
    pub result_name: &'a str,
    /// Concept of the result list; the branch's output concept when unset
    pub output_concept: Option<&'a str>,
}

pub async fn run(
    router: &PipeRouter,
    pipe: &Pipe,
    spec: &BatchPipeSpec,
    memory: WorkingMemory,
    params: &PipeRunParams,
    stack: &CallStack,
) -> PipeworksResult<PipeOutput> {
    let result_name = params.output_name.as_deref().unwrap_or(pipe.code());
    let job = BatchJob {
        caller: pipe.code(),
        branch_pipe_code: &spec.branch_pipe_code,
        input_list_name: &spec.input_list_name,
        input_item_name: &spec.input_item_name,
        result_name,
        output_concept: Some(&pipe.core.output),
    };
    run_items(router, &job, memory, params, stack).await
}

/// Run the branch once per item and store the ordered results as a list
pub async fn run_items(
    router: &PipeRouter,
    job: &BatchJob<'_>,
    mut memory: WorkingMemory,
    params: &PipeRunParams,
    stack: &CallStack,
) -> PipeworksResult<PipeOutput> {
    let list = memory.get_stuff(job.input_list_name)?;
    let items = list
        .content
        .as_list()
        .ok_or_else(|| PipeworksError::BatchInputNotList {
            pipe: job.caller.to_string(),
            input: job.input_list_name.to_string(),
        })?
        .to_vec();
    let item_concept = list.concept.clone();

    tracing::debug!(
        pipe = %job.caller,
        branch = %job.branch_pipe_code,
        items = items.len(),
        "batch fan-out"
    );

    let branch_params = params.for_inner_call();
    let runs = items.into_iter().map(|item| {
        let mut item_memory = memory.clone();
        item_memory.set_new_main_stuff(
            Stuff::new(job.input_item_name, item_concept.as_str(), item),
            job.input_item_name,
        );
        router.run(job.branch_pipe_code, item_memory, branch_params.clone(), stack)
    });
    let results = join_all(runs).await;

    let mut outputs = Vec::with_capacity(results.len());
    for result in results {
        outputs.push(result?.main_stuff.content.clone());
    }

    let concept = match job.output_concept {
        Some(concept) => concept.to_string(),
        None => router
            .library()
            .get_required_pipe(job.branch_pipe_code)?
            .core
            .output
            .clone(),
    };

    memory.set_new_main_stuff(
        Stuff::new(job.result_name, concept, StuffContent::list(outputs)),
        job.result_name,
    );
    PipeOutput::from_memory(memory)
}
