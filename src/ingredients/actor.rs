use super::model::{Ingredient, IngredientSnapshot, DEFAULT_INGREDIENT_NAME};
use crate::error::IngredientError;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

pub(super) enum AggregatorCommand {
    Commit {
        label: String,
        generation: u64,
    },
    AddManual {
        name: Option<String>,
        reply: oneshot::Sender<Ingredient>,
    },
    Rename {
        id: Uuid,
        name: String,
        reply: oneshot::Sender<Result<(), IngredientError>>,
    },
    Remove {
        id: Uuid,
        reply: oneshot::Sender<Result<Ingredient, IngredientError>>,
    },
    Merge {
        labels: Vec<String>,
        reply: oneshot::Sender<usize>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<IngredientSnapshot>,
    },
}

/// Sole owner of the ingredient collection
pub(super) struct AggregatorActor {
    ingredients: Vec<Ingredient>,
    pending: usize,
    /// Bumped by reset; commits from older generations don't count as pending
    generation: u64,
    settle_delay: Duration,
    commands: mpsc::Sender<AggregatorCommand>,
    snapshot: watch::Sender<IngredientSnapshot>,
    token: CancellationToken,
}

impl AggregatorActor {
    pub(super) fn new(
        settle_delay: Duration,
        commands: mpsc::Sender<AggregatorCommand>,
        snapshot: watch::Sender<IngredientSnapshot>,
        token: CancellationToken,
    ) -> Self {
        Self {
            ingredients: Vec::new(),
            pending: 0,
            generation: 0,
            settle_delay,
            commands,
            snapshot,
            token,
        }
    }

    /// Detections arrive on their own unbounded lane so a burst is never
    /// dropped. That lane is drained first, so a command always observes
    /// every detection submitted before it.
    pub(super) async fn run(
        mut self,
        mut receiver: mpsc::Receiver<AggregatorCommand>,
        mut detections: mpsc::UnboundedReceiver<String>,
    ) {
        info!("Ingredient aggregator started");

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                Some(label) = detections.recv() => self.on_detected(label),
                command = receiver.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }

        info!("Ingredient aggregator stopped");
    }

    fn handle(&mut self, command: AggregatorCommand) {
        match command {
            AggregatorCommand::Commit { label, generation } => self.commit(label, generation),
            AggregatorCommand::AddManual { name, reply } => {
                let ingredient =
                    Ingredient::new(name.unwrap_or_else(|| DEFAULT_INGREDIENT_NAME.to_string()));
                debug!("Adding ingredient '{}' manually", ingredient.name);
                self.ingredients.push(ingredient.clone());
                self.publish();
                let _ = reply.send(ingredient);
            }
            AggregatorCommand::Rename { id, name, reply } => {
                let result = self.rename(id, name);
                let _ = reply.send(result);
            }
            AggregatorCommand::Remove { id, reply } => {
                let result = match self.ingredients.iter().position(|i| i.id == id) {
                    Some(index) => {
                        let removed = self.ingredients.remove(index);
                        debug!("Removed ingredient '{}'", removed.name);
                        self.publish();
                        Ok(removed)
                    }
                    None => Err(IngredientError::NotFound { id: id.to_string() }),
                };
                let _ = reply.send(result);
            }
            AggregatorCommand::Merge { labels, reply } => {
                let added = labels
                    .into_iter()
                    .filter(|label| self.insert_unique(label))
                    .count();
                if added > 0 {
                    self.publish();
                }
                let _ = reply.send(added);
            }
            AggregatorCommand::Reset { reply } => {
                self.generation += 1;
                self.pending = 0;
                self.publish();
                let _ = reply.send(());
            }
            AggregatorCommand::Snapshot { reply } => {
                let _ = reply.send(self.current());
            }
        }
    }

    fn on_detected(&mut self, label: String) {
        self.pending += 1;
        self.publish();

        let generation = self.generation;
        if self.settle_delay.is_zero() {
            self.commit(label, generation);
            return;
        }

        let delay = self.settle_delay;
        let commands = self.commands.clone();
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Dropping pending detection '{}'", label);
                }
                _ = tokio::time::sleep(delay) => {
                    let _ = commands.send(AggregatorCommand::Commit { label, generation }).await;
                }
            }
        });
    }

    fn commit(&mut self, label: String, generation: u64) {
        if generation == self.generation {
            self.pending = self.pending.saturating_sub(1);
        }

        if self.insert_unique(&label) {
            info!("Added ingredient '{}'", label);
        } else {
            debug!("Ingredient '{}' already present", label);
        }
        self.publish();
    }

    fn rename(&mut self, id: Uuid, name: String) -> Result<(), IngredientError> {
        if self
            .ingredients
            .iter()
            .any(|i| i.id != id && i.name == name)
        {
            return Err(IngredientError::DuplicateName { name });
        }

        let ingredient = self
            .ingredients
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| IngredientError::NotFound { id: id.to_string() })?;

        debug!("Renaming ingredient '{}' to '{}'", ingredient.name, name);
        ingredient.name = name;
        self.publish();
        Ok(())
    }

    fn insert_unique(&mut self, name: &str) -> bool {
        if self.ingredients.iter().any(|i| i.name == name) {
            return false;
        }
        self.ingredients.push(Ingredient::new(name));
        true
    }

    fn current(&self) -> IngredientSnapshot {
        IngredientSnapshot {
            ingredients: self.ingredients.clone(),
            is_processing: self.pending > 0,
        }
    }

    fn publish(&self) {
        self.snapshot.send_replace(self.current());
    }
}
