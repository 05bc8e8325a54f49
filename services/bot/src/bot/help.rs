//! services/bot/src/bot/help.rs

use crate::adapters::ChatUpdate;
use crate::bot::state::AppState;
use crate::error::BotError;

const HELP_TEXT: &str = "\
/top [n] = Shows the people with the highest meditation streaks\n\
/streak = Shows your current meditation streak\n\
/summary [<email> or `off` or `now`] = Weekly email summaries\n\
/reminders [<hours...> <timezone> or `off`] = Meditation reminders (eg. /reminders 1PM 11PM UTC)\n\
\n\
[backdate?] lets you log something in the past (eg. /meditate 10 22-03-2018). Optional.\n\
/anxiety [0-10] [backdate?] = Anxiety level (0 low, 10 high)\n\
/done [description] [backdate?] = Log something you completed\n\
/exercise [description] [backdate?] = Log your exercise\n\
/fasting [hours] [backdate?] = Your fasting session\n\
/happiness [0-10] [backdate?] = Happiness level (0 low, 10 high)\n\
/journal [entry] [backdate?] = Log a journal entry (publicly or in a private message)\n\
/meditate [minutes] [backdate?] = Record your meditation\n\
/rest = Log a rest day\n\
/sleep [0-24] [backdate?] = Record your sleep (hours)\n\
\n\
[period] = either `weekly`, `biweekly`, `monthly` or `all`\n\
/anxietystats [period] = Graph of your anxiety levels\n\
/fastingstats [period] = Graph of your fasts\n\
/groupstats [period] = Total meditation time by the group\n\
/happystats [period] = Graph of your happiness levels\n\
/journalentries [dd-mm-yyyy] = Retrieve journal entries from a date\n\
/meditatestats [period] = Graph of your meditation history\n\
/sleepstats [period] = Graph of your sleep history";

pub async fn help(state: &AppState, update: &ChatUpdate) -> Result<(), BotError> {
    state.scrub(update).await;
    state.say(update.chat_id, HELP_TEXT).await;
    Ok(())
}
