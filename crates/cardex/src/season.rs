//! # Season Simulation
//!
//! Plays one scripted season end to end against the public facade:
//!
//! ```text
//! deploy ──> fund players ──> buy + open packs (one thread per player)
//!                                   │
//!                                   ▼
//!        claim albums <── burn duplicates <── offer + exchange duplicates
//! ```
//!
//! Pack contents come from [`MockPackBackend`] and are checked by
//! [`EcdsaPackAuthenticator`], so every opening goes through real
//! secp256k1 recovery. Prize payouts the pool cannot cover are skipped and
//! counted, the same way a revert would leave the chain.

use std::path::Path;
use std::thread;

use alloy_primitives::{keccak256, Address, U256};
use cardex_blockchain::{
    BackendError, EcdsaPackAuthenticator, MockPackBackend, PackDataRequest, PackSigner,
};
use cardex_economy::{
    CardEconomy, EconomyConfig, EconomyError, Offer, PackOpeningRequest, PaymentToken,
    SharedEconomy, TokenLedger, OFFER_BURN_RESERVE,
};
use cardex_shared::{CardNumber, EventBus, LedgerEvent, WAD};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Errors
// =============================================================================

/// Errors that stop a season.
#[derive(Error, Debug)]
pub enum SeasonError {
    /// The season file could not be read.
    #[error("cannot read season file: {0}")]
    Io(#[from] std::io::Error),

    /// The season file is not valid TOML for a season.
    #[error("cannot parse season file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Simulation parameters are unusable.
    #[error("invalid season: {0}")]
    Invalid(&'static str),

    /// The economy rejected a scripted call.
    #[error(transparent)]
    Economy(#[from] EconomyError),

    /// The pack backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A player thread panicked.
    #[error("player thread panicked")]
    PlayerPanicked,
}

/// Result type for season runs.
pub type SeasonResult<T> = Result<T, SeasonError>;

// =============================================================================
// Configuration
// =============================================================================

/// How the scripted season is played.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of players.
    pub players: u32,
    /// Packs each player buys and opens.
    pub packs_per_player: u64,
    /// Seed for keys and the backend.
    pub seed: u64,
    /// Tokens minted to each player, who approves all of it to the vault.
    #[serde(with = "cardex_economy::config::wad")]
    pub player_funds: U256,
    /// Tokens minted to the vault before the season opens.
    #[serde(with = "cardex_economy::config::wad")]
    pub vault_reserve: U256,
    /// The backend deals the album card once in this many picks.
    pub album_odds: u32,
    /// Capacity of the ledger event bus.
    pub event_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            players: 8,
            packs_per_player: 20,
            seed: 1,
            player_funds: U256::from(100 * WAD),
            vault_reserve: U256::from(20 * WAD),
            album_odds: cardex_blockchain::backend::DEFAULT_ALBUM_ODDS,
            event_capacity: 65_536,
        }
    }
}

/// A season file: the economy parameters plus the simulation script.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeasonConfig {
    /// Ledger parameters.
    pub economy: EconomyConfig,
    /// Script parameters.
    pub simulation: SimulationConfig,
}

impl SeasonConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// `Parse` on malformed TOML, `Invalid` or `Economy` on bad values.
    pub fn from_toml_str(source: &str) -> SeasonResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, otherwise as [`Self::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> SeasonResult<Self> {
        let path = path.as_ref();
        let config = Self::from_toml_str(&std::fs::read_to_string(path)?)?;
        tracing::info!("Loaded season from {}", path.display());
        Ok(config)
    }

    /// Checks the values are usable.
    ///
    /// # Errors
    ///
    /// Returns the first offending value.
    pub fn validate(&self) -> SeasonResult<()> {
        self.economy.validate()?;
        let simulation = &self.simulation;
        if simulation.players < 2 {
            return Err(SeasonError::Invalid("simulation.players must be at least 2"));
        }
        if simulation.packs_per_player == 0 {
            return Err(SeasonError::Invalid("simulation.packs_per_player must be positive"));
        }
        if simulation.event_capacity == 0 {
            return Err(SeasonError::Invalid("simulation.event_capacity must be positive"));
        }
        Ok(())
    }
}

// =============================================================================
// Report
// =============================================================================

/// What happened during a season.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeasonReport {
    /// Players taking part.
    pub players: usize,
    /// Packs sold.
    pub packs_bought: u64,
    /// Packs opened.
    pub packs_opened: u64,
    /// Cards minted from packs.
    pub cards_minted: usize,
    /// Offers posted.
    pub offers_created: u64,
    /// Offers settled.
    pub exchanges: u64,
    /// Offers still standing at the end.
    pub offers_left: usize,
    /// Cards burned.
    pub cards_burned: u64,
    /// Tickets issued.
    pub tickets_issued: usize,
    /// Albums completed.
    pub albums_completed: u64,
    /// Prize payouts skipped because the pool or the vault fell short.
    pub skipped_prizes: u64,
    /// Total prizes paid.
    pub prizes_paid: U256,
    /// Prize pool at the end.
    pub prize_pool_left: U256,
    /// Ledger events published.
    pub events: usize,
    /// Offer views and offered flags agree at the end.
    pub consistent: bool,
}

// =============================================================================
// Season
// =============================================================================

/// Plays the season described by `config`.
///
/// # Errors
///
/// Any scripted call the economy rejects for a reason other than an
/// unaffordable prize, or a backend failure.
pub fn run_season(config: &SeasonConfig) -> SeasonResult<SeasonReport> {
    config.validate()?;
    let simulation = &config.simulation;
    let mut rng = ChaCha20Rng::seed_from_u64(simulation.seed);

    let deployer = PackSigner::random(&mut rng).address();
    let vault = PackSigner::random(&mut rng).address();
    let backend_key = PackSigner::random(&mut rng);
    let players: Vec<Address> = (0..simulation.players)
        .map(|_| PackSigner::random(&mut rng).address())
        .collect();

    let bus = EventBus::new(simulation.event_capacity);
    let receiver = bus.receiver();
    let mut economy =
        CardEconomy::new(deployer, vault, &config.economy, TokenLedger::new())?
            .with_authenticator(EcdsaPackAuthenticator)
            .with_event_sender(bus.sender());
    economy.add_signer(deployer, backend_key.address())?;
    economy
        .token_mut()
        .mint(vault, simulation.vault_reserve)
        .map_err(EconomyError::from)?;
    for &player in &players {
        economy
            .token_mut()
            .mint(player, simulation.player_funds)
            .map_err(EconomyError::from)?;
        economy
            .token_mut()
            .approve(player, vault, simulation.player_funds);
    }

    let backend = MockPackBackend::new(backend_key, vault, config.economy.catalogue)
        .with_server_seed(keccak256(simulation.seed.to_be_bytes()))
        .with_album_odds(simulation.album_odds);
    tracing::info!(
        "Season opened: {} players, {} packs each",
        players.len(),
        simulation.packs_per_player
    );

    let shared = SharedEconomy::new(economy);
    thread::scope(|scope| {
        let handles: Vec<_> = players
            .iter()
            .map(|&player| {
                let shared = shared.clone();
                let backend = &backend;
                scope.spawn(move || {
                    play_packs(&shared, backend, player, simulation.packs_per_player)
                })
            })
            .collect();
        handles
            .into_iter()
            .try_for_each(|handle| handle.join().unwrap_or(Err(SeasonError::PlayerPanicked)))
    })?;

    let mut report = SeasonReport {
        players: players.len(),
        ..SeasonReport::default()
    };
    tracing::debug!("{} ledger events after the pack phase", receiver.pending_count());
    while let Some(event) = receiver.try_recv() {
        tally(&mut report, &event);
    }

    shared.with(|economy| -> SeasonResult<()> {
        trade(economy, &players, &mut report)?;
        burn_duplicates(economy, &players, &mut report)?;
        claim_albums(economy, &players, &mut report)?;

        let packs = economy.packs();
        report.packs_bought = packs.total_packs_minted();
        report.packs_opened = packs.total_packs_minted() - packs.unopened_count() as u64;
        report.offers_left = economy.offer_book().offers_counter();
        report.prize_pool_left = economy.pool().prizes_balance();
        report.consistent = economy.verify_consistency();
        Ok(())
    })?;

    for event in receiver.drain() {
        tally(&mut report, &event);
    }

    tracing::info!(
        "Season closed: {} exchanges, {} cards burned, {} albums",
        report.exchanges,
        report.cards_burned,
        report.albums_completed
    );
    Ok(report)
}

/// Buys the player's packs, fetches their signed contents and opens them
/// in one batch.
fn play_packs(
    shared: &SharedEconomy,
    backend: &MockPackBackend,
    player: Address,
    packs: u64,
) -> SeasonResult<()> {
    let pack_ids = shared.with(|economy| economy.buy_packs(player, packs))?;
    let openings = pack_ids
        .iter()
        .map(|&pack_id| -> SeasonResult<PackOpeningRequest> {
            let response = backend.handle(&PackDataRequest {
                address: player,
                packet_number: pack_id,
            })?;
            Ok(response.into_opening(pack_id))
        })
        .collect::<SeasonResult<Vec<_>>>()?;
    shared.with(|economy| economy.open_packs(player, &openings))?;
    Ok(())
}

/// Every player offers its duplicates for any card it lacks, then other
/// players settle whatever they can pay for with a duplicate of their own.
fn trade(
    economy: &mut CardEconomy,
    players: &[Address],
    report: &mut SeasonReport,
) -> SeasonResult<()> {
    let album = economy.cards().catalogue().album_card;
    let mut next_offer_id = 1;
    for &player in players {
        let holdings = economy.cards_by_user(&player);
        for (&card_number, &quantity) in holdings.card_numbers.iter().zip(&holdings.quantities) {
            if quantity >= 2 && card_number != album {
                economy.create_offer(player, next_offer_id, card_number, &[])?;
                next_offer_id += 1;
                report.offers_created += 1;
            }
        }
    }

    let offers: Vec<Offer> = economy.offer_book().offers().cloned().collect();
    for offer in offers {
        if economy.offer_book().get(offer.offer_id).is_none() {
            continue;
        }
        let Some((counterparty, card_number)) = find_counterparty(economy, players, &offer) else {
            continue;
        };
        match economy.confirm_offer_exchange(
            counterparty,
            counterparty,
            card_number,
            offer.owner,
            offer.card_number,
        ) {
            Ok(_) => report.exchanges += 1,
            Err(err) => tracing::debug!("Offer {} not settled: {}", offer.offer_id, err),
        }
    }
    Ok(())
}

/// A player lacking the offered card who holds a spare, unoffered copy of a
/// card the offer owner lacks.
fn find_counterparty(
    economy: &CardEconomy,
    players: &[Address],
    offer: &Offer,
) -> Option<(Address, CardNumber)> {
    let cards = economy.cards();
    let album = cards.catalogue().album_card;
    players
        .iter()
        .filter(|&&player| {
            player != offer.owner && cards.card_quantity(&player, offer.card_number) == 0
        })
        .find_map(|&player| {
            let holdings = economy.cards_by_user(&player);
            holdings
                .card_numbers
                .iter()
                .zip(&holdings.quantities)
                .zip(&holdings.offered)
                .find(|&((&card_number, &quantity), &offered)| {
                    quantity >= 2
                        && !offered
                        && card_number != album
                        && cards.card_quantity(&offer.owner, card_number) == 0
                })
                .map(|((&card_number, _), _)| (player, card_number))
        })
}

/// Burns spare copies, keeping one of each card and two of offered ones.
fn burn_duplicates(
    economy: &mut CardEconomy,
    players: &[Address],
    report: &mut SeasonReport,
) -> SeasonResult<()> {
    let album = economy.cards().catalogue().album_card;
    for &player in players {
        let holdings = economy.cards_by_user(&player);
        let mut burn = Vec::new();
        for ((&card_number, &quantity), &offered) in holdings
            .card_numbers
            .iter()
            .zip(&holdings.quantities)
            .zip(&holdings.offered)
        {
            let keep = if offered { OFFER_BURN_RESERVE } else { 1 };
            if card_number != album && quantity > keep {
                burn.extend(std::iter::repeat(card_number).take((quantity - keep) as usize));
            }
        }
        if burn.is_empty() {
            continue;
        }
        match economy.burn_cards(player, &burn) {
            Ok(outcome) => {
                report.cards_burned += outcome.receipt.burned;
                report.tickets_issued += outcome.tickets.len();
                report.prizes_paid = report.prizes_paid.saturating_add(outcome.prize_paid);
            }
            Err(err) if is_unaffordable(&err) => {
                tracing::warn!("{} burn reverted: {}", player, err);
                report.skipped_prizes += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

/// Every album card holder claims the grand prize once.
fn claim_albums(
    economy: &mut CardEconomy,
    players: &[Address],
    report: &mut SeasonReport,
) -> SeasonResult<()> {
    let album = economy.cards().catalogue().album_card;
    for &player in players {
        if economy.cards().card_quantity(&player, album) == 0 {
            continue;
        }
        match economy.finish_album(player) {
            Ok(amount) => {
                report.albums_completed += 1;
                report.prizes_paid = report.prizes_paid.saturating_add(amount);
            }
            Err(err) if is_unaffordable(&err) => {
                tracing::warn!("{} album claim reverted: {}", player, err);
                report.skipped_prizes += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn tally(report: &mut SeasonReport, event: &LedgerEvent) {
    report.events += 1;
    if let LedgerEvent::PackOpened { pack_data, .. } = event {
        report.cards_minted += pack_data.len();
    }
}

fn is_unaffordable(err: &EconomyError) -> bool {
    matches!(
        err,
        EconomyError::InsufficientPrizePool { .. } | EconomyError::InsufficientVaultBalance { .. }
    )
}
