//! Synthetic training examples built from commentary templates
//!
//! Used to pad the dataset with tournament-specific teams and players when
//! scraped commentary is scarce.

use super::dataset::TrainingExample;
use crate::EventType;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

pub const DEFAULT_COUNT: usize = 2000;
pub const DEFAULT_OUTPUT_FILE: &str = "afcon2025_training.jsonl";

pub const SYSTEM_PROMPT: &str = "Tu es un commentateur sportif professionnel pour Afrique Sports. Tu génères des commentaires de match de la CAN 2025 en français, avec un style vivant, précis et engageant, similaire à L'Équipe et RMC Sport.";

pub const TEAMS: &[(&str, &[&str])] = &[
    ("Maroc", &["Hakimi", "Ziyech", "Mazraoui", "Brahim Diaz", "El-Kaabi", "Ounahi", "Salah-Eddine"]),
    ("Sénégal", &["Sadio Mané", "Idrissa Gueye", "Kalidou Koulibaly", "Nicolas Jackson", "Pape Matar Sarr"]),
    ("Égypte", &["Mohamed Salah", "Trezeguet", "Omar Marmoush", "Mohamed Elneny"]),
    ("Nigeria", &["Victor Osimhen", "Ademola Lookman", "Alex Iwobi", "Wilfred Ndidi"]),
    ("Côte d'Ivoire", &["Sébastien Haller", "Nicolas Pépé", "Franck Kessié", "Wilfried Singo"]),
    ("Cameroun", &["Vincent Aboubakar", "André Onana", "Zambo Anguissa", "Bryan Mbeumo"]),
    ("Algérie", &["Riyad Mahrez", "Islam Slimani", "Youcef Belaïli", "Baghdad Bounedjah"]),
    ("Ghana", &["Mohammed Kudus", "Thomas Partey", "Jordan Ayew", "Kamaldeen Sulemana"]),
    ("Tunisie", &["Wahbi Khazri", "Youssef Msakni", "Ellyes Skhiri", "Hannibal Mejbri"]),
    ("Mali", &["Amadou Haidara", "Yves Bissouma", "Adama Traoré", "Moussa Djenepo"]),
];

/// Share of each event type in scraped commentary
pub const EVENT_DISTRIBUTION: &[(EventType, f64)] = &[
    (EventType::Commentary, 0.82),
    (EventType::Goal, 0.10),
    (EventType::Substitution, 0.055),
    (EventType::Penalty, 0.012),
    (EventType::YellowCard, 0.008),
    (EventType::RedCard, 0.005),
];

const MINUTE_RANGES: [(u32, u32); 6] = [(1, 15), (16, 30), (31, 45), (46, 60), (61, 75), (76, 90)];

fn patterns(event_type: EventType) -> &'static [&'static str] {
    match event_type {
        EventType::Goal => &[
            "{player} ouvre le score d'une frappe magnifique du gauche! Le ballon vient se loger dans la lucarne opposée, le gardien n'a rien pu faire.",
            "But splendide de {player}! Sur un centre parfait de {player2}, il propulse sa tête au fond des filets.",
            "{player} délivre une frappe enroulée du droit! Le ballon trompe le gardien et finit sa course au fond des filets. {team} prend l'avantage!",
            "Quelle action collective! {player2} sert {player} qui contrôle brillamment et ajuste le gardien d'un tir croisé. {team} mène désormais au score!",
            "{player} inscrit son {n}e but en sélection! D'une frappe puissante à l'entrée de la surface, il permet à {team} de doubler la mise.",
            "But contre son camp! Sur un centre tendu de {player}, le défenseur adverse dévie malencontreusement le ballon dans ses propres filets.",
            "{player} ne se fait pas prier! Sur penalty, il envoie le gardien du mauvais côté et ouvre le score pour {team}.",
        ],
        EventType::Substitution => &[
            "{player} est remplacé par {player2}. Ovationné par l'enceinte, il quitte le terrain après une belle prestation.",
            "Double changement pour {team}. {player} cède sa place à {player2}.",
            "Premier changement dans cette rencontre : {player} entre en jeu à la place de {player2}.",
            "{player}, touché à la cuisse, ne peut continuer. {player2} le remplace et va devoir être rapidement opérationnel.",
            "{team} procède à un triple changement. {player}, {player2} et {player3} quittent le terrain.",
        ],
        EventType::YellowCard => &[
            "{player} accroche {player2} de manière irrégulière et se fait rappeler à l'ordre par l'arbitre. Carton jaune mérité.",
            "Faute un peu sévère de {player} sur {player2}. L'arbitre sort le carton jaune sans hésiter.",
            "{player} proteste auprès de l'arbitre et écope d'un carton jaune pour contestation.",
            "Tacle par derrière de {player} sur {player2}. Carton jaune logique pour le joueur de {team}.",
        ],
        EventType::RedCard => &[
            "Carton rouge pour {player}! Expulsion directe suite à un geste dangereux sur {player2}. {team} se retrouve à dix!",
            "{player} reçoit un deuxième carton jaune et doit quitter le terrain. {team} va devoir terminer le match en infériorité numérique.",
        ],
        EventType::Penalty => &[
            "Pénalty accordé à {team}! {player} a été accroché dans la surface par {player2}. Décision sans contestation.",
            "{player} transforme le penalty! D'une frappe puissante du pied gauche, il trompe le gardien et permet à {team} de prendre l'avantage.",
            "{player} repousse le penalty de {player2}! Quelle parade du gardien qui maintient son équipe dans le match!",
        ],
        _ => &[
            "{player} délivre un centre appliqué sortant du pied gauche. {player2} repousse de la tête.",
            "Belle combinaison entre {player} et {player2} sur le flanc droit. Le ballon est finalement récupéré par la défense adverse.",
            "Le ballon circule bien dans le camp de {team}. {player} recherche la profondeur mais le hors-jeu est signalé.",
            "{player} tente une frappe lointaine du gauche. Le ballon file largement au-dessus de la transversale.",
            "Corner exécuté côté gauche par {player}. {player2} se signale avec une reprise de volée qui passe à côté du cadre.",
            "{team} met la pression dans cette fin de première mi-temps. {player} sollicite beaucoup le ballon sur son aile.",
            "Belle intervention défensive de {player} qui intercepte une passe dangereuse dans la surface.",
            "{player} déborde sur le côté droit et centre en retrait pour {player2}, mais le ballon est contré par un défenseur.",
            "Le rythme commence à baisser. Les deux équipes se neutralisent au milieu de terrain.",
            "{player}, auteur d'un très bon match, délivre un centre tendu dans la surface. {player2} ne parvient pas à reprendre le ballon.",
        ],
    }
}

/// Generates template-based examples; seeded generators are reproducible
pub struct SyntheticGenerator {
    rng: StdRng,
}

impl SyntheticGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        SyntheticGenerator { rng }
    }

    pub fn generate(&mut self, count: usize) -> Vec<TrainingExample> {
        (0..count).map(|_| self.example()).collect()
    }

    fn event_type(&mut self) -> EventType {
        let roll: f64 = self.rng.gen();
        let mut cumulative = 0.0;
        for &(event_type, share) in EVENT_DISTRIBUTION {
            cumulative += share;
            if roll <= cumulative {
                return event_type;
            }
        }
        EventType::Commentary
    }

    /// Uniform over six 15-minute windows, with stoppage time at 45 and 90
    fn minute(&mut self) -> String {
        let (low, high) = MINUTE_RANGES[self.rng.gen_range(0..MINUTE_RANGES.len())];
        match self.rng.gen_range(low..=high) {
            45 | 46 => format!("45'+{}", self.rng.gen_range(1..=4)),
            90 => format!("90'+{}", self.rng.gen_range(1..=6)),
            minute => format!("{}'", minute),
        }
    }

    fn example(&mut self) -> TrainingExample {
        let event_type = self.event_type();
        let picked: Vec<_> = TEAMS.choose_multiple(&mut self.rng, 2).collect();
        let (team, players) = *picked[0];
        let (rival, rival_players) = *picked[1];

        let pattern = patterns(event_type).choose(&mut self.rng).copied().unwrap_or_default();
        let minute = self.minute();

        let text = pattern
            .replace("{player}", players.choose(&mut self.rng).copied().unwrap_or_default())
            .replace("{player2}", rival_players.choose(&mut self.rng).copied().unwrap_or_default())
            .replace("{player3}", players.choose(&mut self.rng).copied().unwrap_or_default())
            .replace("{team}", team)
            .replace("{team2}", rival)
            .replace("{n}", &self.rng.gen_range(2..=15).to_string());

        TrainingExample {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: format!(
                "Génère un commentaire pour: Minute {} - {} - {} vs {}",
                minute, event_type, team, rival
            ),
            assistant_response: text,
        }
    }
}

/// Event type named in a generated user prompt
pub fn prompt_event_type(example: &TrainingExample) -> Option<EventType> {
    let tag = example.user_prompt.split(" - ").nth(1)?;
    EVENT_DISTRIBUTION
        .iter()
        .map(|&(event_type, _)| event_type)
        .find(|event_type| event_type.as_str() == tag)
}
