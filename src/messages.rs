//! User-facing reply texts.

pub const START_HELP: &str = "Я помогу подготовиться к экзамену по курсу «Облачные технологии».\n\n\
     Пришлите вопрос текстом или фотографию с текстом вопроса, и я отвечу на него.\n\n\
     Команды:\n\
     /start - начало работы\n\
     /help - эта справка";

pub const UNKNOWN_COMMAND: &str = "Неизвестная команда. Наберите /help, чтобы увидеть список команд.";

pub const INCORRECT_INPUT: &str = "Я могу обработать только текстовое сообщение или фотографию.";

pub const MULTIPLE_PHOTOS: &str = "Я могу обработать только одну фотографию.";

pub const PHOTO_PROCESSING_ERROR: &str = "Не удалось обработать фотографию.";

pub const PHOTO_DOWNLOAD_ERROR: &str = "Не удалось загрузить фотографию.";

pub const OCR_RECOGNITION_ERROR: &str = "Не удалось распознать текст на фотографии.";

pub const NO_TEXT_RECOGNIZED: &str = "На изображении не удалось распознать текст";

pub const NO_ANSWER: &str = "Я не смог подготовить ответ на ваш запрос.";

pub const RECOGNIZING_NOTICE: &str = "Получаю текст с фото...";

pub const ANSWERING_NOTICE: &str = "Генерирую ответ...";

pub const NO_MESSAGE: &str = "No message to process.";

pub const PROCESSED: &str = "Message processed.";

pub const INTERNAL_ERROR: &str = "Произошла ошибка при обработке сообщения";
