use crate::error::GameError;
use crate::types::PlayerId;
use rand::seq::SliceRandom;
use rand::Rng;

/// Randomly partition players into pairs. With an odd count the leftover
/// player joins the last pair, forming a triad.
///
/// Fewer than two players is an error; a lone player has nobody to be
/// compared against.
pub fn pair_up<R: Rng + ?Sized>(
    rng: &mut R,
    players: &[PlayerId],
) -> Result<Vec<Vec<PlayerId>>, GameError> {
    if players.len() < 2 {
        return Err(GameError::NotEnoughPlayers(players.len()));
    }

    let mut shuffled = players.to_vec();
    shuffled.shuffle(rng);

    let mut groups: Vec<Vec<PlayerId>> = shuffled.chunks(2).map(|c| c.to_vec()).collect();
    if groups.last().is_some_and(|g| g.len() == 1) {
        if let Some(leftover) = groups.pop() {
            if let Some(last) = groups.last_mut() {
                last.extend(leftover);
            }
        }
    }

    Ok(groups)
}
