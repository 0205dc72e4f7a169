//! Round and offer state machine
//!
//! Each game is played over a fixed number of rounds. In every round P1 may
//! propose a trade (tokens offered to P2 in exchange for tokens requested from
//! P2) or decline to offer, and P2 answers an offer by accepting, rejecting or
//! snatching it. Variants change which moves are available:
//!
//! * G2 lets P2 force P1 to offer (and starts every round forced)
//! * G3 lets P1 hand P2 a shame token after a snatch
//! * G4 lets P1 report a snatch, undoing it and fining P2
//!
//! Every operation here checks the acting [`Role`] and the round phase. An
//! illegal or unaffordable move returns a [`Rejection`] and leaves the state
//! untouched; the room drops those silently. A successful move returns the
//! [`Transition`] the room has to carry out.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    constants,
    player::{Players, Role, Tokens},
};

/// A named rule set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    /// Plain trading
    #[default]
    G1,
    /// P2 may force P1 to offer; rounds start forced
    G2,
    /// P1 may assign a shame token after a snatch
    G3,
    /// P1 may report a snatch
    G4,
    /// Reserved, plays like G1
    G5,
}

impl Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::G1 => "G1",
            Self::G2 => "G2",
            Self::G3 => "G3",
            Self::G4 => "G4",
            Self::G5 => "G5",
        };
        f.write_str(name)
    }
}

/// What P1 may do after P2 snatches an offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowUp {
    /// Give P2 a shame token
    Shame,
    /// Report the snatch, reversing it and fining P2
    Report,
}

/// Rules selected by a [`Variant`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rules {
    /// Whether every round starts with P1 forced to offer
    pub forced_by_default: bool,
    /// Follow-up that keeps a snatched round open, if any
    pub snatch_follow_up: Option<FollowUp>,
}

impl Variant {
    /// Rule table for this variant
    pub const fn rules(self) -> Rules {
        match self {
            Self::G1 | Self::G5 => Rules {
                forced_by_default: false,
                snatch_follow_up: None,
            },
            Self::G2 => Rules {
                forced_by_default: true,
                snatch_follow_up: None,
            },
            Self::G3 => Rules {
                forced_by_default: false,
                snatch_follow_up: Some(FollowUp::Shame),
            },
            Self::G4 => Rules {
                forced_by_default: false,
                snatch_follow_up: Some(FollowUp::Report),
            },
        }
    }
}

/// P1's decision for the round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum P1Action {
    /// P1 proposed an offer
    Offer,
    /// P1 declined to offer
    NoOffer,
}

/// P2's answer to an offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    /// Swap the offered tokens for the requested ones
    Accept,
    /// Turn the offer down
    Reject,
    /// Take the offered tokens and give nothing back
    Snatch,
}

/// The offer on the table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    /// Tokens P1 hands to P2
    pub offered: Tokens,
    /// Tokens P1 wants from P2
    pub requested: Tokens,
    /// Whether the offer still awaits P2's answer
    pub active: bool,
    /// Whether a snatch actually moved the offered tokens
    #[serde(skip)]
    snatched: bool,
}

/// Reasons a move is refused
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The move belongs to the other seat
    #[error("move not allowed for this role")]
    WrongRole,
    /// The move does not fit the current phase of the round
    #[error("move not allowed at this point of the round")]
    WrongPhase,
    /// The seat already decided this round
    #[error("decision already made this round")]
    AlreadyDecided,
    /// P1 was forced to offer and may not decline
    #[error("offer is forced")]
    Forced,
    /// The variant has no such follow-up
    #[error("move not part of this variant")]
    NotApplicable,
    /// A proposed amount exceeds the holder's balance
    #[error("insufficient holdings")]
    InsufficientHoldings,
    /// A seat is empty
    #[error("both seats must be taken")]
    NotSeated,
}

/// What the room must do after a successful move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The round stays open
    Stay,
    /// A new round started
    NextRound(u8),
    /// The last round resolved; the game is over
    Finished,
}

/// Per-round decision state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundState {
    /// Active rule set
    pub variant: Variant,
    /// Current round, starting at 1
    pub round: u8,
    /// P1's decision, if made
    pub p1_action: Option<P1Action>,
    /// P2's answer, if made
    pub p2_action: Option<Response>,
    /// Whether P1 must offer this round
    #[serde(rename = "forcedByP2")]
    pub forced_by_p2: bool,
    /// Whether P1 reported the snatch (G4)
    pub reported: bool,
    /// Whether P1 assigned a shame token (G3)
    pub shame_assigned: bool,
    /// The offer of this round
    pub offer: Offer,
}

impl Default for RoundState {
    fn default() -> Self {
        Self::new(Variant::default())
    }
}

impl RoundState {
    /// Fresh state at round 1 of `variant`
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            round: 1,
            p1_action: None,
            p2_action: None,
            forced_by_p2: variant.rules().forced_by_default,
            reported: false,
            shame_assigned: false,
            offer: Offer::default(),
        }
    }

    /// Clears every per-round flag and the offer
    fn reset_round(&mut self) {
        *self = Self {
            round: self.round,
            ..Self::new(self.variant)
        };
    }

    fn clear_offer(&mut self) {
        self.offer = Offer::default();
    }

    /// Whether the round waits for P1's follow-up to a snatch
    pub fn awaiting_follow_up(&self) -> Option<FollowUp> {
        if self.p2_action == Some(Response::Snatch) {
            self.variant.rules().snatch_follow_up
        } else {
            None
        }
    }

    /// Switches the rule set and starts over at round 1
    pub fn set_variant(&mut self, variant: Variant) {
        *self = Self::new(variant);
    }

    /// Moves to the next round, or ends the game after the last one
    pub fn advance(&mut self) -> Transition {
        if self.round < constants::room::ROUND_COUNT {
            self.round += 1;
            self.reset_round();
            Transition::NextRound(self.round)
        } else {
            self.clear_offer();
            Transition::Finished
        }
    }

    /// P1 puts an offer on the table
    ///
    /// # Errors
    ///
    /// * `Rejection::WrongRole` - the actor is not P1
    /// * `Rejection::AlreadyDecided` - P1 already offered or declined
    /// * `Rejection::NotSeated` - a seat is empty
    /// * `Rejection::InsufficientHoldings` - P1 cannot pay `offered` or P2
    ///   cannot pay `requested`
    pub fn propose(
        &mut self,
        players: &Players,
        actor: Role,
        offered: Tokens,
        requested: Tokens,
    ) -> Result<Transition, Rejection> {
        if actor != Role::P1 {
            return Err(Rejection::WrongRole);
        }
        if self.offer.active || self.p1_action.is_some() {
            return Err(Rejection::AlreadyDecided);
        }
        let (Some(p1), Some(p2)) = (players.holdings(Role::P1), players.holdings(Role::P2)) else {
            return Err(Rejection::NotSeated);
        };
        if !p1.covers(offered) || !p2.covers(requested) {
            return Err(Rejection::InsufficientHoldings);
        }

        self.p2_action = None;
        self.reported = false;
        self.shame_assigned = false;
        self.offer = Offer {
            offered,
            requested,
            active: true,
            snatched: false,
        };
        self.p1_action = Some(P1Action::Offer);

        Ok(Transition::Stay)
    }

    /// P1 declines to offer; the round ends without a P2 turn
    ///
    /// # Errors
    ///
    /// * `Rejection::WrongRole` - the actor is not P1
    /// * `Rejection::Forced` - P2 forced an offer
    /// * `Rejection::AlreadyDecided` - P1 already offered or declined
    pub fn decline(&mut self, actor: Role) -> Result<Transition, Rejection> {
        if actor != Role::P1 {
            return Err(Rejection::WrongRole);
        }
        if self.forced_by_p2 {
            return Err(Rejection::Forced);
        }
        if self.offer.active || self.p1_action.is_some() {
            return Err(Rejection::AlreadyDecided);
        }

        self.p1_action = Some(P1Action::NoOffer);

        Ok(self.advance())
    }

    /// P2 forces (or releases) P1's obligation to offer
    ///
    /// # Errors
    ///
    /// Returns `Rejection::WrongRole` if the actor is not P2.
    pub fn set_forced(&mut self, actor: Role, forced: bool) -> Result<Transition, Rejection> {
        if actor != Role::P2 {
            return Err(Rejection::WrongRole);
        }

        self.forced_by_p2 = forced;

        Ok(Transition::Stay)
    }

    /// P2 answers the offer on the table
    ///
    /// Accepting swaps both sides at once, provided both still hold their
    /// part. Snatching moves only the offered tokens and keeps the offer
    /// amounts around; in G3 and G4 the round then stays open for P1's
    /// follow-up.
    ///
    /// # Errors
    ///
    /// * `Rejection::WrongRole` - the actor is not P2
    /// * `Rejection::AlreadyDecided` - P2 already answered this round
    /// * `Rejection::WrongPhase` - there is no active offer
    pub fn respond(
        &mut self,
        players: &mut Players,
        actor: Role,
        response: Response,
    ) -> Result<Transition, Rejection> {
        if actor != Role::P2 {
            return Err(Rejection::WrongRole);
        }
        if self.p2_action.is_some() {
            return Err(Rejection::AlreadyDecided);
        }
        if !self.offer.active {
            return Err(Rejection::WrongPhase);
        }

        self.p2_action = Some(response);
        let Offer {
            offered, requested, ..
        } = self.offer;

        match response {
            Response::Accept => {
                let affordable = players
                    .holdings(Role::P1)
                    .is_some_and(|p1| p1.covers(offered))
                    && players
                        .holdings(Role::P2)
                        .is_some_and(|p2| p2.covers(requested));
                if affordable {
                    players.transfer(Role::P1, Role::P2, offered);
                    players.transfer(Role::P2, Role::P1, requested);
                }
                self.clear_offer();
            }
            Response::Reject => self.clear_offer(),
            Response::Snatch => {
                self.offer.active = false;
                self.offer.snatched = players.transfer(Role::P1, Role::P2, offered);
            }
        }

        if response == Response::Snatch && self.variant.rules().snatch_follow_up.is_some() {
            Ok(Transition::Stay)
        } else {
            Ok(self.advance())
        }
    }

    /// P1 decides whether to report a snatch (G4)
    ///
    /// Reporting returns the snatched tokens to P1 and then fines P2 the
    /// requested amount. Either way the offer is cleared and the round ends.
    ///
    /// # Errors
    ///
    /// * `Rejection::WrongRole` - the actor is not P1
    /// * `Rejection::NotApplicable` - the variant has no report step
    /// * `Rejection::WrongPhase` - the round is not waiting on a report
    pub fn report(
        &mut self,
        players: &mut Players,
        actor: Role,
        report: bool,
    ) -> Result<Transition, Rejection> {
        self.check_follow_up(actor, FollowUp::Report)?;

        self.reported = report;
        if report {
            let Offer {
                offered,
                requested,
                snatched,
                ..
            } = self.offer;
            if snatched {
                players.transfer(Role::P2, Role::P1, offered);
            }
            players.transfer(Role::P2, Role::P1, requested);
        }
        self.clear_offer();

        Ok(self.advance())
    }

    /// P1 decides whether to shame P2 for a snatch (G3)
    ///
    /// # Errors
    ///
    /// * `Rejection::WrongRole` - the actor is not P1
    /// * `Rejection::NotApplicable` - the variant has no shame step
    /// * `Rejection::WrongPhase` - the round is not waiting on a shame decision
    pub fn assign_shame(
        &mut self,
        players: &mut Players,
        actor: Role,
        assign: bool,
    ) -> Result<Transition, Rejection> {
        self.check_follow_up(actor, FollowUp::Shame)?;

        self.shame_assigned = assign;
        if assign {
            if let Some(p2) = players.by_role_mut(Role::P2) {
                p2.shame_tokens += 1;
            }
        }

        Ok(self.advance())
    }

    fn check_follow_up(&self, actor: Role, wanted: FollowUp) -> Result<(), Rejection> {
        if actor != Role::P1 {
            return Err(Rejection::WrongRole);
        }
        if self.variant.rules().snatch_follow_up != Some(wanted) {
            return Err(Rejection::NotApplicable);
        }
        if self.awaiting_follow_up() != Some(wanted) {
            return Err(Rejection::WrongPhase);
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::player::Id;

    fn table(variant: Variant) -> (RoundState, Players) {
        let mut players = Players::default();
        players
            .seat(Id::new(), "ana".to_owned(), "#fff".to_owned())
            .unwrap();
        players
            .seat(Id::new(), "bo".to_owned(), "#000".to_owned())
            .unwrap();
        players.reset_balances(|role| match role {
            Role::P1 => Tokens::new(10, 0),
            Role::P2 => Tokens::new(0, 10),
        });
        (RoundState::new(variant), players)
    }

    fn holdings(players: &Players) -> (Tokens, Tokens) {
        (
            players.holdings(Role::P1).unwrap(),
            players.holdings(Role::P2).unwrap(),
        )
    }

    #[test]
    fn test_accept_swaps_both_sides() {
        let (mut round, mut players) = table(Variant::G1);
        round
            .propose(&players, Role::P1, Tokens::new(3, 0), Tokens::new(0, 2))
            .unwrap();
        assert!(round.offer.active);
        assert_eq!(round.p1_action, Some(P1Action::Offer));

        let transition = round
            .respond(&mut players, Role::P2, Response::Accept)
            .unwrap();

        assert_eq!(transition, Transition::NextRound(2));
        assert_eq!(
            holdings(&players),
            (Tokens::new(7, 2), Tokens::new(3, 8))
        );
        assert_eq!(round.round, 2);
        assert!(!round.offer.active);
        assert_eq!(round.p1_action, None);
        assert_eq!(round.p2_action, None);
    }

    #[test]
    fn test_accept_conserves_tokens() {
        let (mut round, mut players) = table(Variant::G1);
        let (p1, p2) = holdings(&players);
        round
            .propose(&players, Role::P1, Tokens::new(10, 0), Tokens::new(0, 10))
            .unwrap();
        round
            .respond(&mut players, Role::P2, Response::Accept)
            .unwrap();
        let (q1, q2) = holdings(&players);
        assert_eq!(p1 + p2, q1 + q2);
        assert_eq!(q1, Tokens::new(0, 10));
    }

    #[test]
    fn test_proposal_beyond_holdings_is_rejected() {
        let (mut round, players) = table(Variant::G1);
        let before = round.clone();

        assert_eq!(
            round.propose(&players, Role::P1, Tokens::new(11, 0), Tokens::default()),
            Err(Rejection::InsufficientHoldings)
        );
        assert_eq!(
            round.propose(&players, Role::P1, Tokens::new(0, 1), Tokens::default()),
            Err(Rejection::InsufficientHoldings)
        );
        assert_eq!(
            round.propose(&players, Role::P1, Tokens::default(), Tokens::new(1, 0)),
            Err(Rejection::InsufficientHoldings)
        );
        assert_eq!(round, before);
    }

    #[test]
    fn test_only_p1_proposes_once() {
        let (mut round, players) = table(Variant::G1);
        assert_eq!(
            round.propose(&players, Role::P2, Tokens::new(1, 0), Tokens::default()),
            Err(Rejection::WrongRole)
        );
        round
            .propose(&players, Role::P1, Tokens::new(1, 0), Tokens::default())
            .unwrap();
        assert_eq!(
            round.propose(&players, Role::P1, Tokens::new(2, 0), Tokens::default()),
            Err(Rejection::AlreadyDecided)
        );
        assert_eq!(round.offer.offered, Tokens::new(1, 0));
    }

    #[test]
    fn test_propose_needs_both_seats() {
        let mut players = Players::default();
        players
            .seat(Id::new(), "ana".to_owned(), "#fff".to_owned())
            .unwrap();
        let mut round = RoundState::default();
        assert_eq!(
            round.propose(&players, Role::P1, Tokens::default(), Tokens::default()),
            Err(Rejection::NotSeated)
        );
    }

    #[test]
    fn test_respond_only_once_per_round() {
        let (mut round, mut players) = table(Variant::G3);
        round
            .propose(&players, Role::P1, Tokens::new(3, 0), Tokens::new(0, 2))
            .unwrap();
        assert_eq!(
            round.respond(&mut players, Role::P2, Response::Snatch),
            Ok(Transition::Stay)
        );
        let after_first = holdings(&players);

        assert_eq!(
            round.respond(&mut players, Role::P2, Response::Accept),
            Err(Rejection::AlreadyDecided)
        );
        assert_eq!(
            round.respond(&mut players, Role::P2, Response::Snatch),
            Err(Rejection::AlreadyDecided)
        );
        assert_eq!(holdings(&players), after_first);
    }

    #[test]
    fn test_respond_without_offer_is_rejected() {
        let (mut round, mut players) = table(Variant::G1);
        assert_eq!(
            round.respond(&mut players, Role::P2, Response::Accept),
            Err(Rejection::WrongPhase)
        );
        assert_eq!(
            round.respond(&mut players, Role::P1, Response::Accept),
            Err(Rejection::WrongRole)
        );
        assert_eq!(round.p2_action, None);
    }

    #[test]
    fn test_reject_moves_nothing() {
        let (mut round, mut players) = table(Variant::G1);
        let before = holdings(&players);
        round
            .propose(&players, Role::P1, Tokens::new(3, 0), Tokens::new(0, 2))
            .unwrap();
        assert_eq!(
            round.respond(&mut players, Role::P2, Response::Reject),
            Ok(Transition::NextRound(2))
        );
        assert_eq!(holdings(&players), before);
    }

    #[test]
    fn test_snatch_in_plain_variant_advances() {
        let (mut round, mut players) = table(Variant::G1);
        round
            .propose(&players, Role::P1, Tokens::new(3, 0), Tokens::new(0, 2))
            .unwrap();
        assert_eq!(
            round.respond(&mut players, Role::P2, Response::Snatch),
            Ok(Transition::NextRound(2))
        );
        assert_eq!(
            holdings(&players),
            (Tokens::new(7, 0), Tokens::new(3, 10))
        );
    }

    #[test]
    fn test_snatch_then_report_reverses_and_fines() {
        let (mut round, mut players) = table(Variant::G4);
        round
            .propose(&players, Role::P1, Tokens::new(3, 0), Tokens::new(0, 2))
            .unwrap();
        assert_eq!(
            round.respond(&mut players, Role::P2, Response::Snatch),
            Ok(Transition::Stay)
        );
        assert_eq!(
            holdings(&players),
            (Tokens::new(7, 0), Tokens::new(3, 10))
        );
        assert_eq!(round.offer.requested, Tokens::new(0, 2));
        assert_eq!(round.awaiting_follow_up(), Some(FollowUp::Report));

        assert_eq!(
            round.report(&mut players, Role::P1, true),
            Ok(Transition::NextRound(2))
        );
        assert_eq!(
            holdings(&players),
            (Tokens::new(10, 2), Tokens::new(0, 8))
        );
        assert_eq!(round.offer, Offer::default());
    }

    #[test]
    fn test_declining_to_report_keeps_snatch() {
        let (mut round, mut players) = table(Variant::G4);
        round
            .propose(&players, Role::P1, Tokens::new(3, 0), Tokens::new(0, 2))
            .unwrap();
        round
            .respond(&mut players, Role::P2, Response::Snatch)
            .unwrap();
        assert_eq!(
            round.report(&mut players, Role::P1, false),
            Ok(Transition::NextRound(2))
        );
        assert_eq!(
            holdings(&players),
            (Tokens::new(7, 0), Tokens::new(3, 10))
        );
    }

    #[test]
    fn test_report_outside_snatch_is_rejected() {
        let (mut round, mut players) = table(Variant::G4);
        assert_eq!(
            round.report(&mut players, Role::P1, true),
            Err(Rejection::WrongPhase)
        );

        let (mut round, mut players) = table(Variant::G3);
        round
            .propose(&players, Role::P1, Tokens::new(3, 0), Tokens::new(0, 2))
            .unwrap();
        round
            .respond(&mut players, Role::P2, Response::Snatch)
            .unwrap();
        assert_eq!(
            round.report(&mut players, Role::P1, true),
            Err(Rejection::NotApplicable)
        );
        assert_eq!(
            round.assign_shame(&mut players, Role::P2, true),
            Err(Rejection::WrongRole)
        );
        assert_eq!(round.round, 1);
    }

    #[test]
    fn test_shame_after_snatch() {
        let (mut round, mut players) = table(Variant::G3);
        round
            .propose(&players, Role::P1, Tokens::new(2, 0), Tokens::new(0, 1))
            .unwrap();
        round
            .respond(&mut players, Role::P2, Response::Snatch)
            .unwrap();
        assert_eq!(
            round.assign_shame(&mut players, Role::P1, true),
            Ok(Transition::NextRound(2))
        );
        assert_eq!(players.by_role(Role::P2).unwrap().shame_tokens, 1);
        assert_eq!(
            holdings(&players),
            (Tokens::new(8, 0), Tokens::new(2, 10))
        );
        assert_eq!(
            round.assign_shame(&mut players, Role::P1, true),
            Err(Rejection::WrongPhase)
        );
        assert_eq!(players.by_role(Role::P2).unwrap().shame_tokens, 1);
    }

    #[test]
    fn test_decline_advances_without_movement() {
        let (mut round, players) = table(Variant::G1);
        let before = holdings(&players);
        assert_eq!(round.decline(Role::P1), Ok(Transition::NextRound(2)));
        assert_eq!(holdings(&players), before);
        assert_eq!(round.decline(Role::P2), Err(Rejection::WrongRole));
    }

    #[test]
    fn test_decline_blocked_when_forced_or_offered() {
        let (mut round, players) = table(Variant::G2);
        assert!(round.forced_by_p2);
        assert_eq!(round.decline(Role::P1), Err(Rejection::Forced));

        round.set_forced(Role::P2, false).unwrap();
        round
            .propose(&players, Role::P1, Tokens::new(1, 0), Tokens::default())
            .unwrap();
        assert_eq!(round.decline(Role::P1), Err(Rejection::AlreadyDecided));
    }

    #[test]
    fn test_only_p2_forces() {
        let (mut round, _) = table(Variant::G1);
        assert_eq!(round.set_forced(Role::P1, true), Err(Rejection::WrongRole));
        assert_eq!(round.set_forced(Role::P2, true), Ok(Transition::Stay));
        assert_eq!(round.decline(Role::P1), Err(Rejection::Forced));
    }

    #[test]
    fn test_forced_flag_recomputed_each_round() {
        let (mut round, _) = table(Variant::G2);
        round.set_forced(Role::P2, false).unwrap();
        round.decline(Role::P1).unwrap();
        assert_eq!(round.round, 2);
        assert!(round.forced_by_p2);
    }

    #[test]
    fn test_last_round_finishes() {
        let (mut round, _) = table(Variant::G1);
        assert_eq!(round.decline(Role::P1), Ok(Transition::NextRound(2)));
        assert_eq!(round.decline(Role::P1), Ok(Transition::NextRound(3)));
        assert_eq!(round.decline(Role::P1), Ok(Transition::Finished));
        assert_eq!(round.round, constants::room::ROUND_COUNT);
    }

    #[test]
    fn test_set_variant_resets_round() {
        let (mut round, _) = table(Variant::G1);
        round.decline(Role::P1).unwrap();
        round.set_variant(Variant::G2);
        assert_eq!(round.round, 1);
        assert_eq!(round.variant, Variant::G2);
        assert!(round.forced_by_p2);
        assert_eq!(round.p1_action, None);
    }

    #[test]
    fn test_rules_table() {
        assert_eq!(Variant::G5.rules(), Variant::G1.rules());
        assert!(Variant::G2.rules().forced_by_default);
        assert_eq!(Variant::G3.rules().snatch_follow_up, Some(FollowUp::Shame));
        assert_eq!(Variant::G4.rules().snatch_follow_up, Some(FollowUp::Report));
    }

    #[test]
    fn test_round_state_serialization() {
        let round = RoundState::new(Variant::G2);
        let json = serde_json::to_value(&round).unwrap();
        assert_eq!(json["variant"], "G2");
        assert_eq!(json["forcedByP2"], true);
        assert_eq!(json["p1Action"], serde_json::Value::Null);
        assert_eq!(json["offer"]["offered"]["tokenA"], 0);
    }
}
