//! Concurrent registry of channel arbitrators.

use super::arbitrator::ChannelArbitrator;
use super::publisher::{GapHandler, MarketDataPublisher, NullGapHandler};
use super::stats::ArbitratorStatsSnapshot;
use crate::config::{ArbitratorConfig, FeedConfig};
use crate::error::FeedError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tracing::{error, info};

/// Routes inbound ranges to the arbitrator of their channel.
///
/// Receiver threads share one manager; lookups take a shard read lock only
/// long enough to clone the arbitrator handle.
pub struct ChannelManager<P, G = NullGapHandler>
where
    P: MarketDataPublisher,
    G: GapHandler,
{
    channels: DashMap<u32, Arc<ChannelArbitrator<P, G>>>,
}

impl<P, G> Default for ChannelManager<P, G>
where
    P: MarketDataPublisher,
    G: GapHandler,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P, G> ChannelManager<P, G>
where
    P: MarketDataPublisher,
    G: GapHandler,
{
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Builds one arbitrator per configured channel. `factory` supplies the
    /// publisher and gap handler of each.
    ///
    /// # Errors
    ///
    /// Any error of [`FeedConfig::validate`] or of arbitrator construction.
    pub fn from_config<F>(config: &FeedConfig, mut factory: F) -> Result<Self, FeedError>
    where
        F: FnMut(&ArbitratorConfig) -> (P, G),
    {
        config.validate()?;
        let manager = Self::new();
        for channel in &config.channels {
            let (publisher, gap_handler) = factory(channel);
            manager.add_channel(channel, publisher, gap_handler)?;
        }
        Ok(manager)
    }

    /// Registers an arbitrator for `config.channel_id`.
    ///
    /// # Errors
    ///
    /// [`FeedError::DuplicateChannel`] if the channel is taken, or a spool
    /// sizing error.
    pub fn add_channel(
        &self,
        config: &ArbitratorConfig,
        publisher: P,
        gap_handler: G,
    ) -> Result<Arc<ChannelArbitrator<P, G>>, FeedError> {
        match self.channels.entry(config.channel_id) {
            Entry::Occupied(_) => Err(FeedError::DuplicateChannel {
                channel_id: config.channel_id,
            }),
            Entry::Vacant(entry) => {
                let arbitrator = Arc::new(ChannelArbitrator::with_gap_handler(
                    config,
                    publisher,
                    gap_handler,
                )?);
                entry.insert(Arc::clone(&arbitrator));
                info!(channel_id = config.channel_id, "channel registered");
                Ok(arbitrator)
            }
        }
    }

    /// Unregisters a channel.
    pub fn remove_channel(&self, channel_id: u32) -> Option<Arc<ChannelArbitrator<P, G>>> {
        let removed = self.channels.remove(&channel_id).map(|(_, arbitrator)| arbitrator);
        if removed.is_some() {
            info!(channel_id, "channel removed");
        }
        removed
    }

    /// The arbitrator of `channel_id`.
    #[must_use]
    pub fn get(&self, channel_id: u32) -> Option<Arc<ChannelArbitrator<P, G>>> {
        self.channels
            .get(&channel_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Hands a range to the arbitrator of `channel_id`.
    ///
    /// # Errors
    ///
    /// [`FeedError::UnknownChannel`] if the channel is not registered,
    /// otherwise as [`ChannelArbitrator::publish`].
    pub fn publish(
        &self,
        channel_id: u32,
        from_seq: u64,
        msg_count: u32,
        bytes: &[u8],
    ) -> Result<bool, FeedError> {
        let arbitrator = self
            .get(channel_id)
            .ok_or(FeedError::UnknownChannel { channel_id })?;
        arbitrator
            .publish(from_seq, msg_count, bytes)
            .inspect_err(|e| error!(channel_id, error = %e, "channel failed"))
    }

    /// Registered channel ids, ascending.
    #[must_use]
    pub fn channel_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.channels.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Counter snapshot of every channel, by ascending channel id.
    #[must_use]
    pub fn stats(&self) -> Vec<(u32, ArbitratorStatsSnapshot)> {
        let mut stats: Vec<_> = self
            .channels
            .iter()
            .map(|entry| (*entry.key(), entry.value().stats().snapshot()))
            .collect();
        stats.sort_unstable_by_key(|(channel_id, _)| *channel_id);
        stats
    }
}

impl<P, G> std::fmt::Debug for ChannelManager<P, G>
where
    P: MarketDataPublisher,
    G: GapHandler,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelManager")
            .field("channels", &self.channel_ids())
            .finish()
    }
}
