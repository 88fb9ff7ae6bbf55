//! Questions and the bank they are drawn from.

use rand::Rng;

use crate::GameError;

/// A single multiple-choice question.
///
/// `correct_option_index` never leaves the server while the question is
/// open; the projection and event code strip it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
    pub correct_option_index: usize,
}

impl Question {
    pub fn new<T, O>(text: T, options: O, correct_option_index: usize) -> Self
    where
        T: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Question {
            text: text.into(),
            options: options.into_iter().map(Into::into).collect(),
            correct_option_index,
        }
    }
}

/// A static, in-memory pool of questions with random selection.
///
/// The bank is immutable once built and shared across rooms behind an
/// `Arc`. Selection is uniform, except that [`QuestionBank::draw`] never
/// repeats the immediately preceding question when the bank has more than
/// one entry.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Builds a bank, rejecting empty lists and malformed entries.
    ///
    /// # Errors
    /// [`GameError::EmptyBank`] for an empty list,
    /// [`GameError::InvalidQuestion`] for an entry with fewer than two
    /// options or a correct index outside its options.
    pub fn new(questions: Vec<Question>) -> Result<Self, GameError> {
        if questions.is_empty() {
            return Err(GameError::EmptyBank);
        }
        for (index, question) in questions.iter().enumerate() {
            if question.options.len() < 2
                || question.correct_option_index >= question.options.len()
            {
                return Err(GameError::InvalidQuestion(index));
            }
        }
        Ok(QuestionBank { questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Picks a random question, skipping `exclude` when the bank has more
    /// than one entry.
    ///
    /// Returns the drawn index alongside the question; callers keep the
    /// index to pass back as `exclude` on the next draw.
    pub fn draw(&self, exclude: Option<usize>) -> (usize, &Question) {
        let len = self.questions.len();
        let mut rng = rand::rng();
        let index = match exclude {
            Some(previous) if len > 1 && previous < len => {
                // Uniform over every index except the previous one.
                let drawn = rng.random_range(0..len - 1);
                if drawn >= previous { drawn + 1 } else { drawn }
            }
            _ => rng.random_range(0..len),
        };
        (index, &self.questions[index])
    }

    /// The general-knowledge bank the server ships with.
    pub fn builtin() -> Self {
        fn q(text: &str, options: [&str; 4], correct_option_index: usize) -> Question {
            Question::new(text, options, correct_option_index)
        }

        let questions = vec![
            q("What is the capital of France?", ["Berlin", "Madrid", "Paris", "Rome"], 2),
            q("Which planet is known as the Red Planet?", ["Earth", "Mars", "Jupiter", "Saturn"], 1),
            q("Who wrote 'Romeo and Juliet'?", ["William Wordsworth", "Charles Dickens", "William Shakespeare", "Jane Austen"], 2),
            q("What is the largest ocean on Earth?", ["Atlantic Ocean", "Indian Ocean", "Arctic Ocean", "Pacific Ocean"], 3),
            q("What is the square root of 64?", ["6", "7", "8", "9"], 2),
            q("Who painted the Mona Lisa?", ["Vincent van Gogh", "Pablo Picasso", "Leonardo da Vinci", "Claude Monet"], 2),
            q("What is the chemical symbol for water?", ["H2O", "CO2", "O2", "NaCl"], 0),
            q("In which year did the Titanic sink?", ["1912", "1905", "1921", "1918"], 0),
            q("How many continents are there?", ["5", "6", "7", "8"], 2),
            q("Which element does 'O' represent on the periodic table?", ["Gold", "Oxygen", "Osmium", "Ozone"], 1),
            q("Which organ in the human body is responsible for pumping blood?", ["Liver", "Heart", "Brain", "Kidneys"], 1),
            q("What is the fastest land animal?", ["Cheetah", "Lion", "Horse", "Elephant"], 0),
            q("How many degrees are in a circle?", ["90", "180", "270", "360"], 3),
            q("Who developed the theory of relativity?", ["Isaac Newton", "Albert Einstein", "Galileo Galilei", "Niels Bohr"], 1),
            q("Which country is known as the Land of the Rising Sun?", ["China", "Japan", "South Korea", "Thailand"], 1),
            q("What is the hardest natural substance on Earth?", ["Gold", "Iron", "Diamond", "Graphite"], 2),
            q("Who is the author of 'Harry Potter'?", ["J.K. Rowling", "J.R.R. Tolkien", "Stephen King", "George R.R. Martin"], 0),
            q("How many legs does a spider have?", ["6", "8", "10", "12"], 1),
            q("Which gas do plants absorb from the atmosphere?", ["Oxygen", "Nitrogen", "Carbon Dioxide", "Helium"], 2),
            q("What is the largest mammal in the world?", ["Elephant", "Blue Whale", "Giraffe", "Hippopotamus"], 1),
            q("Who discovered penicillin?", ["Marie Curie", "Alexander Fleming", "Isaac Newton", "Louis Pasteur"], 1),
            q("What currency is used in Japan?", ["Yen", "Won", "Dollar", "Euro"], 0),
            q("What is the main language spoken in Brazil?", ["Spanish", "English", "Portuguese", "French"], 2),
            q("What is the largest desert in the world?", ["Sahara", "Gobi", "Antarctic", "Kalahari"], 2),
            q("What is the smallest unit of matter?", ["Molecule", "Atom", "Cell", "Electron"], 1),
            q("What is the powerhouse of the cell?", ["Nucleus", "Ribosome", "Mitochondria", "Chloroplast"], 2),
            q("Which planet is closest to the sun?", ["Venus", "Earth", "Mercury", "Mars"], 2),
            q("How many players are there in a football (soccer) team?", ["9", "10", "11", "12"], 2),
            q("Which animal is known as the King of the Jungle?", ["Tiger", "Elephant", "Lion", "Cheetah"], 2),
            q("What is the national flower of Japan?", ["Tulip", "Cherry Blossom", "Rose", "Sunflower"], 1),
            q("Which city is known as the Big Apple?", ["Los Angeles", "Chicago", "New York", "Miami"], 2),
            q("Who was the first man to step on the moon?", ["Yuri Gagarin", "Buzz Aldrin", "Neil Armstrong", "Michael Collins"], 2),
            q("What is the boiling point of water in Celsius?", ["90\u{b0}C", "95\u{b0}C", "100\u{b0}C", "110\u{b0}C"], 2),
            q("Which element is known as the 'King of Chemicals'?", ["Sodium", "Sulfur", "Ammonia", "Hydrochloric Acid"], 3),
            q("Who painted the ceiling of the Sistine Chapel?", ["Raphael", "Michelangelo", "Donatello", "Leonardo da Vinci"], 1),
            q("Which is the longest river in the world?", ["Amazon", "Nile", "Yangtze", "Mississippi"], 1),
            q("What is the process by which plants make their food?", ["Photosynthesis", "Respiration", "Digestion", "Fermentation"], 0),
            q("What is the smallest bone in the human body?", ["Stapes", "Femur", "Humerus", "Radius"], 0),
            q("Which country hosted the 2016 Summer Olympics?", ["Russia", "Brazil", "Japan", "China"], 1),
            q("What is the primary ingredient in guacamole?", ["Tomato", "Onion", "Avocado", "Pepper"], 2),
            q("How many time zones does Russia have?", ["7", "9", "11", "13"], 2),
            q("What does DNA stand for?", ["Deoxyribonucleic Acid", "Digital Network Architecture", "Dynamic Neural Assembly", "Dual Neuron Array"], 0),
            q("What color is a ruby?", ["Blue", "Green", "Red", "Yellow"], 2),
            q("Who directed 'Jurassic Park'?", ["James Cameron", "Christopher Nolan", "Steven Spielberg", "George Lucas"], 2),
            q("Which planet has the most moons?", ["Earth", "Mars", "Jupiter", "Saturn"], 3),
            q("How many colors are there in a rainbow?", ["5", "6", "7", "8"], 2),
            q("Which famous scientist introduced the three laws of motion?", ["Galileo Galilei", "Albert Einstein", "Nikola Tesla", "Isaac Newton"], 3),
            q("Which language has the most native speakers?", ["English", "Mandarin", "Spanish", "Hindi"], 1),
            q("What is the capital city of Australia?", ["Sydney", "Melbourne", "Perth", "Canberra"], 3),
        ];

        // The list above is static and well formed, so this cannot fail.
        QuestionBank { questions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_question_bank() -> QuestionBank {
        QuestionBank::new(vec![
            Question::new("First?", ["a", "b"], 0),
            Question::new("Second?", ["a", "b"], 1),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_bank_is_rejected() {
        assert_eq!(QuestionBank::new(vec![]).unwrap_err(), GameError::EmptyBank);
    }

    #[test]
    fn test_bank_rejects_question_with_one_option() {
        let err = QuestionBank::new(vec![Question::new("Only?", ["a"], 0)]).unwrap_err();
        assert_eq!(err, GameError::InvalidQuestion(0));
    }

    #[test]
    fn test_bank_rejects_out_of_range_correct_index() {
        let err =
            QuestionBank::new(vec![Question::new("Which?", ["a", "b"], 2)]).unwrap_err();
        assert_eq!(err, GameError::InvalidQuestion(0));
    }

    #[test]
    fn test_draw_never_repeats_previous_index() {
        let bank = two_question_bank();
        let (first, _) = bank.draw(None);
        for _ in 0..50 {
            let (next, _) = bank.draw(Some(first));
            assert_ne!(next, first);
        }
    }

    #[test]
    fn test_draw_from_single_question_bank_ignores_exclude() {
        let bank =
            QuestionBank::new(vec![Question::new("Only?", ["a", "b"], 0)]).unwrap();
        let (index, _) = bank.draw(Some(0));
        assert_eq!(index, 0);
    }

    #[test]
    fn test_draw_reaches_every_index() {
        let bank = two_question_bank();
        let mut seen = [false; 2];
        for _ in 0..50 {
            let (index, _) = bank.draw(None);
            seen[index] = true;
        }
        assert!(seen[0] && seen[1]);
    }

    #[test]
    fn test_builtin_bank_is_well_formed() {
        let bank = QuestionBank::builtin();
        assert!(bank.len() > 1);
        for i in 0..bank.len() {
            let question = bank.get(i).unwrap();
            assert!(question.options.len() >= 2);
            assert!(question.correct_option_index < question.options.len());
        }
    }
}
