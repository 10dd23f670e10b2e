use arena_server::domain::Vec2;
use arena_server::domain::geometry::{circles_overlap, distance};
use arena_server::domain::state::Player;
use arena_server::domain::systems::combat::{Clash, bounce, clash};
use arena_server::domain::systems::lifecycle::score;
use arena_server::domain::tuning::{MAX_SIDES, MIN_SIDES, MatchTuning, SideTable};
use arena_server::domain::units::Unit;
use proptest::prelude::*;

fn side_count() -> impl Strategy<Value = u8> {
    MIN_SIDES..=MAX_SIDES
}

fn point() -> impl Strategy<Value = Vec2> {
    (-500.0f32..500.0, -300.0f32..300.0).prop_map(|(x, y)| Vec2::new(x, y))
}

fn close(a: Vec2, b: Vec2) -> bool {
    distance(a, b) < 1e-3
}

proptest! {
    #[test]
    fn when_sides_clash_then_outcome_follows_the_side_rule(a in side_count(), b in side_count()) {
        let expected = if a == b {
            Clash::MutualDestruction
        } else if a == b + 1 {
            Clash::FirstWins
        } else if b == a + 1 {
            Clash::SecondWins
        } else {
            Clash::Bounce
        };

        prop_assert_eq!(clash(a, b), expected);
        prop_assert_eq!(clash(b, a), expected.mirrored());
    }

    #[test]
    fn when_overlap_is_tested_then_argument_order_does_not_matter(
        a in point(),
        b in point(),
        radius_a in 1.0f32..60.0,
        radius_b in 1.0f32..60.0,
    ) {
        prop_assert_eq!(
            circles_overlap(a, radius_a, b, radius_b),
            circles_overlap(b, radius_b, a, radius_a)
        );
    }

    #[test]
    fn when_units_bounce_then_swapping_them_gives_the_same_positions(
        pos_a in point(),
        offset in (-30.0f32..30.0, -30.0f32..30.0),
        sides_a in side_count(),
        sides_b in side_count(),
        target_a in point(),
        target_b in point(),
    ) {
        let table = SideTable::default();
        let pos_b = Vec2::new(pos_a.x + offset.0, pos_a.y + offset.1);
        prop_assume!(distance(pos_a, pos_b) > 0.01);

        let mut a = Unit::producer("p1".to_string(), pos_a, table.spec(sides_a));
        a.target = Some(target_a);
        let b = Unit::hostile(pos_b, target_b, table.spec(sides_b), 1.0);

        let (mut a1, mut b1) = (a.clone(), b.clone());
        bounce(&mut a1, &mut b1);
        let (mut a2, mut b2) = (a.clone(), b.clone());
        bounce(&mut b2, &mut a2);

        prop_assert!(close(a1.pos, a2.pos), "{:?} vs {:?}", a1.pos, a2.pos);
        prop_assert!(close(b1.pos, b2.pos), "{:?} vs {:?}", b1.pos, b2.pos);
        // Afterwards they are at least touching.
        prop_assert!(distance(a1.pos, b1.pos) >= a.size + b.size - 1e-3);
    }

    #[test]
    fn when_a_player_gains_sides_or_resources_then_score_never_drops(
        unit_sides in prop::collection::vec(side_count(), 0..6),
        resources in 0.0f64..1000.0,
        extra in 0.0f64..500.0,
        pick in any::<prop::sample::Index>(),
    ) {
        let table = SideTable::default();
        let tuning = MatchTuning::default();
        let mut player = Player::new("p1".to_string(), "#3498DB", resources);
        for (i, sides) in unit_sides.iter().enumerate() {
            let pos = Vec2::new(i as f32 * 100.0, 0.0);
            player.units.push(Unit::producer("p1".to_string(), pos, table.spec(*sides)));
        }
        let base = score(&player, &tuning);

        let mut richer = player.clone();
        richer.resources += extra;
        prop_assert!(score(&richer, &tuning) >= base);

        if !player.units.is_empty() {
            let mut bigger = player.clone();
            let unit = &mut bigger.units[pick.index(unit_sides.len())];
            unit.sides = (unit.sides + 1).min(MAX_SIDES);
            prop_assert!(score(&bigger, &tuning) >= base);
        }
    }
}
