//! Producer, workers and merger connected by channels.
//!
//! ```text
//!                   +-> worker 0 -+
//!   producer -(in)--+-> worker 1 -+--> merger -(out)-> consumer
//!                   +-> worker .. +
//! ```
//!
//! The producer generates experiments one at a time, each worker simulates one experiment at a time
//! and the merger forwards finished experiments in completion order.
//! The consumer callback runs on the calling thread.
//!
//! Every blocking channel operation is paired with the cancellation signal in a `select!`.
//! After cancellation no stage starts new work, simulations already running finish their rounds
//! and are then dropped.
//! All stages run as scoped threads and are joined before `run` returns.

use super::{cancel::CancellationToken, channel_capacity, Experiment, PipelineConfig};
use crate::error::{Error, Result};
use crossbeam_channel::{bounded, select, Receiver, Select, Sender};
use crossbeam_utils::thread;
use tracing::{info, warn};

type Message = Result<Experiment>;

/// What happened during one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Experiments handed to the consumer
    pub delivered: usize,
    pub cancelled: bool,
}

pub struct ExperimentPipeline {
    config: PipelineConfig,
    token: CancellationToken,
}

enum MergeEvent {
    Cancelled,
    Received(Message),
    Closed(usize),
}

impl ExperimentPipeline {
    pub fn new(config: PipelineConfig, token: CancellationToken) -> Self {
        ExperimentPipeline { config, token }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Generate `config.experiments()` experiments with `generate`, simulate them on
    /// `config.workers()` threads and hand every finished one to `consume`.
    ///
    /// A failing generator, simulation or consumer cancels the pipeline
    /// and the first such error is returned once all stages are joined.
    pub fn run<G, C>(&self, generate: G, mut consume: C) -> Result<PipelineSummary>
    where
        G: FnMut(usize) -> Result<Experiment> + Send,
        C: FnMut(Experiment) -> Result<()>,
    {
        let capacity = channel_capacity()?;
        let token = &self.token;

        thread::scope(|scope| {
            let (in_tx, in_rx) = bounded::<Message>(capacity);
            let mut worker_outputs = Vec::with_capacity(self.config.workers());

            scope.spawn(move |_| produce(self.config.experiments(), generate, in_tx, token));

            for worker in 0..self.config.workers() {
                let (out_tx, out_rx) = bounded::<Message>(capacity);
                worker_outputs.push(out_rx);
                let in_rx = in_rx.clone();
                scope.spawn(move |_| simulate(worker, in_rx, out_tx, token));
            }
            drop(in_rx);

            let (merged_tx, merged_rx) = bounded::<Message>(capacity);
            scope.spawn(move |_| merge(worker_outputs, merged_tx, token));

            let mut summary = PipelineSummary::default();
            let mut first_error = None;

            for message in merged_rx.iter() {
                match message.and_then(&mut consume) {
                    Ok(()) => summary.delivered += 1,
                    Err(e) => {
                        warn!("stopping experiment pipeline: {}", e);
                        token.cancel();
                        first_error = Some(e);
                        break;
                    }
                }
            }
            // unblocks the merger in case we stopped early
            drop(merged_rx);

            summary.cancelled = token.is_cancelled();
            match first_error {
                Some(e) => Err(e),
                None => Ok(summary),
            }
        })
        .map_err(|_| Error::StagePanicked("experiment pipeline"))?
    }
}

fn produce<G>(experiments: usize, mut generate: G, output: Sender<Message>, token: &CancellationToken)
where
    G: FnMut(usize) -> Result<Experiment>,
{
    let done = token.signal();

    for id in 0..experiments {
        if token.is_cancelled() {
            warn!(produced = id, "producer cancelled");
            return;
        }

        let experiment = generate(id);
        let failed = experiment.is_err();
        select! {
            recv(done) -> _ => {
                warn!(produced = id, "producer cancelled");
                return;
            }
            send(output, experiment) -> res => {
                if res.is_err() || failed {
                    return;
                }
            }
        }
    }

    info!(produced = experiments, "producer done");
}

fn simulate(worker: usize, input: Receiver<Message>, output: Sender<Message>, token: &CancellationToken) {
    let done = token.signal();
    let mut simulated = 0;

    loop {
        let message = select! {
            recv(done) -> _ => break,
            recv(input) -> message => match message {
                Ok(message) => message,
                Err(_) => break,
            },
        };
        // select picks randomly among ready operations
        if token.is_cancelled() {
            break;
        }

        let message = message.and_then(Experiment::simulate);
        simulated += 1;

        select! {
            recv(done) -> _ => break,
            send(output, message) -> res => {
                if res.is_err() {
                    break;
                }
            }
        }
    }

    if token.is_cancelled() {
        warn!(worker, simulated, "worker cancelled");
    } else {
        info!(worker, simulated, "worker done");
    }
}

fn merge(mut inputs: Vec<Receiver<Message>>, output: Sender<Message>, token: &CancellationToken) {
    let done = token.signal();

    while !inputs.is_empty() {
        let event = {
            let mut sel = Select::new();
            sel.recv(&done);
            for input in &inputs {
                sel.recv(input);
            }
            let oper = sel.select();
            match oper.index() {
                0 => {
                    let _ = oper.recv(&done);
                    MergeEvent::Cancelled
                }
                i => match oper.recv(&inputs[i - 1]) {
                    Ok(message) => MergeEvent::Received(message),
                    Err(_) => MergeEvent::Closed(i - 1),
                },
            }
        };

        match event {
            MergeEvent::Cancelled => break,
            MergeEvent::Closed(index) => {
                inputs.swap_remove(index);
            }
            MergeEvent::Received(message) => {
                select! {
                    recv(done) -> _ => break,
                    send(output, message) -> res => {
                        if res.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }

    if token.is_cancelled() {
        warn!(open_inputs = inputs.len(), "merger cancelled");
    } else {
        info!("merger done");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastr::graph::*;
    use crate::topology::TopologyKind;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::BTreeSet;

    fn experiment(id: usize) -> Result<Experiment> {
        let graph = WeightedGraph::new(SimulationParams::new(3, 2, 2, 1.0, "0", "2")?);
        graph.add_edges("0", "1", FREE_FLOW_WEIGHT);
        graph.add_edges("1", "2", FREE_FLOW_WEIGHT);
        Ok(Experiment::new(id, TopologyKind::Complete, graph, StdRng::seed_from_u64(id as u64)))
    }

    fn pipeline(experiments: usize, workers: usize) -> ExperimentPipeline {
        ExperimentPipeline::new(PipelineConfig::new(experiments, workers, 0).unwrap(), CancellationToken::new())
    }

    #[test]
    fn delivers_every_experiment_once() {
        let mut ids = Vec::new();
        let summary = pipeline(25, 4)
            .run(experiment, |experiment| {
                assert_eq!(experiment.rounds_completed(), 3);
                ids.push(experiment.id());
                Ok(())
            })
            .unwrap();

        assert_eq!(summary, PipelineSummary { delivered: 25, cancelled: false });
        assert_eq!(ids.len(), 25);
        assert_eq!(ids.iter().copied().collect::<BTreeSet<_>>(), (0..25).collect());
    }

    #[test]
    fn no_experiments() {
        let summary = pipeline(0, 3).run(experiment, |_| panic!("nothing to consume")).unwrap();
        assert_eq!(summary.delivered, 0);
    }

    #[test]
    fn cancelled_before_start() {
        let pipeline = pipeline(10, 2);
        pipeline.token().cancel();

        let summary = pipeline.run(experiment, |_| Ok(())).unwrap();
        assert_eq!(summary.delivered, 0);
        assert!(summary.cancelled);
    }

    #[test]
    fn cancel_from_consumer_terminates() {
        let pipeline = pipeline(1000, 4);
        let token = pipeline.token().clone();
        let mut generated = 0;

        let summary = pipeline
            .run(
                |id| {
                    generated += 1;
                    experiment(id)
                },
                |_| {
                    token.cancel();
                    Ok(())
                },
            )
            .unwrap();

        assert!(summary.cancelled);
        assert!(summary.delivered >= 1);
        assert!(summary.delivered < 1000);
        assert!(generated < 1000);
    }

    #[test]
    fn generator_errors_are_returned() {
        let result = pipeline(10, 2).run(
            |id| if id == 3 { Err(Error::invalid_topology("broken")) } else { experiment(id) },
            |_| Ok(()),
        );
        assert!(matches!(result, Err(Error::InvalidTopology(_))));
    }

    #[test]
    fn consumer_errors_are_returned() {
        let pipeline = pipeline(10, 2);
        let result = pipeline.run(experiment, |_| Err(Error::invalid_params("disk full")));
        assert!(matches!(result, Err(Error::InvalidParams(_))));
        assert!(pipeline.token().is_cancelled());
    }
}
